use super::board::{BroadcastChannel, InMemoryBoard};
use super::config::Config;
use super::primitives::{Behavior, Group, Payload, Shareholder};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use threshold_primitives::{
    curve::bls12377::G1Curve,
    group::{mul_generator, Curve, Element},
    poly::Idx,
};

/// Runs every shareholder on a single thread over one in-memory board.
/// Shareholders take turns draining the log until nobody has anything left to
/// read, which makes runs deterministic in their message order.
pub struct Driver {
    pub board: InMemoryBoard,
    pub group: Group<G1Curve>,
    pub shareholders: Vec<Shareholder<G1Curve>>,
    cursors: Vec<usize>,
}

impl Driver {
    /// Creates `config.n` shareholders, honest unless listed in `behaviors`
    pub fn new(config: &Config, behaviors: &[(Idx, Behavior)]) -> Self {
        let mut rng = ChaCha20Rng::from_rng(rand::thread_rng()).unwrap();
        let private_keys = (0..config.n)
            .map(|_| <G1Curve as Curve>::Scalar::rand(&mut rng))
            .collect::<Vec<_>>();
        let keys = private_keys
            .iter()
            .map(mul_generator::<G1Curve>)
            .collect::<Vec<_>>();
        let group = Group::<G1Curve>::new(keys, config).unwrap();

        let shareholders = private_keys
            .into_iter()
            .enumerate()
            .map(|(i, private_key)| {
                let behavior = behaviors
                    .iter()
                    .find(|(idx, _)| *idx as usize == i)
                    .map(|(_, b)| *b)
                    .unwrap_or_default();
                Shareholder::new(
                    i as Idx,
                    private_key,
                    group.clone(),
                    behavior,
                    ChaCha20Rng::from_rng(&mut rng).unwrap(),
                )
                .unwrap()
            })
            .collect();

        Self {
            board: InMemoryBoard::new(),
            group,
            shareholders,
            cursors: vec![0; config.n],
        }
    }

    /// Appends a payload of `sender` to the board
    pub fn publish(&self, sender: Idx, payload: Payload<G1Curve>) {
        self.board.broadcast(payload.seal(sender).unwrap()).unwrap();
    }

    /// Every shareholder publishes its share contribution
    pub fn contribute(&mut self) {
        for i in 0..self.shareholders.len() {
            if let Some(payload) = self.shareholders[i].share_contributions().unwrap() {
                self.publish(i as Idx, payload);
            }
        }
    }

    /// Delivers the log to every shareholder until it stops growing
    pub fn run(&mut self) {
        self.run_except(&[]);
    }

    /// Same as `run`, the shareholders in `skipped` read nothing
    pub fn run_except(&mut self, skipped: &[Idx]) {
        loop {
            let mut progressed = false;
            for i in 0..self.shareholders.len() {
                if skipped.contains(&(i as Idx)) {
                    continue;
                }
                while let Some(envelope) = self.board.get(self.cursors[i]) {
                    self.cursors[i] += 1;
                    progressed = true;
                    for payload in self.shareholders[i].deliver(&envelope) {
                        self.publish(i as Idx, payload);
                    }
                }
            }
            if !progressed {
                break;
            }
        }
    }

    /// Delivers the next unread entry to shareholder `i` and returns what it
    /// would broadcast, without publishing it. `None` once the log is read.
    pub fn step(&mut self, i: Idx) -> Option<Vec<Payload<G1Curve>>> {
        let cursor = &mut self.cursors[i as usize];
        let envelope = self.board.get(*cursor)?;
        *cursor += 1;
        Some(self.shareholders[i as usize].deliver(&envelope))
    }
}

use super::{
    board::BroadcastChannel,
    config::Config,
    primitives::{Alert, AlertLog, AvssError, AvssResult, Payload, SharePair, Shareholder},
};

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use threshold_primitives::{group::Curve, poly::Idx};
use tracing::{debug, error};

struct Shared<C: Curve> {
    machine: Mutex<Shareholder<C>>,
    /// signalled after every processed envelope
    progress: Condvar,
    stopped: AtomicBool,
}

/// A shareholder driven by its own worker thread, which reads the broadcast
/// channel in order and publishes whatever the state machine emits.
pub struct Node<C: Curve, B: BroadcastChannel> {
    index: Idx,
    shared: Arc<Shared<C>>,
    board: Arc<B>,
    alerts: AlertLog,
    worker: Option<JoinHandle<()>>,
}

impl<C, B> Node<C, B>
where
    C: Curve,
    B: BroadcastChannel + 'static,
{
    /// Starts the worker thread of `shareholder`
    pub fn spawn(shareholder: Shareholder<C>, board: Arc<B>, config: &Config) -> Self {
        let index = shareholder.index();
        let alerts = shareholder.alerts().clone();
        let shared = Arc::new(Shared {
            machine: Mutex::new(shareholder),
            progress: Condvar::new(),
            stopped: AtomicBool::new(false),
        });

        let worker = {
            let shared = shared.clone();
            let board = board.clone();
            let poll_interval = config.poll_interval();
            thread::spawn(move || run_worker(index, &shared, board.as_ref(), poll_interval))
        };

        Self {
            index,
            shared,
            board,
            alerts,
            worker: Some(worker),
        }
    }
}

impl<C, B> Node<C, B>
where
    C: Curve,
    B: BroadcastChannel,
{
    pub fn index(&self) -> Idx {
        self.index
    }

    fn lock(&self) -> AvssResult<MutexGuard<'_, Shareholder<C>>> {
        self.shared
            .machine
            .lock()
            .map_err(|_| AvssError::LockPoisoned)
    }

    /// Publishes this shareholder's contribution. Returns `false` if it was
    /// already published or the shareholder withholds it.
    pub fn broadcast_share_contributions(&self) -> AvssResult<bool> {
        let payload = self.lock()?.share_contributions()?;
        match payload {
            Some(payload) => {
                self.board.broadcast(payload.seal(self.index)?)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Blocks until QUAL is frozen
    pub fn wait_for_qual(&self, timeout: Duration) -> AvssResult<Vec<Idx>> {
        self.wait_for("QUAL", timeout, |machine| machine.qual().map(<[Idx]>::to_vec))
    }

    /// Blocks until the public key is reconstructed
    pub fn wait_for_public_key(&self, timeout: Duration) -> AvssResult<C::Point> {
        self.wait_for("the public key", timeout, |machine| {
            machine.public_key().cloned()
        })
    }

    fn wait_for<T>(
        &self,
        what: &'static str,
        timeout: Duration,
        get: impl Fn(&Shareholder<C>) -> Option<T>,
    ) -> AvssResult<T> {
        let stopped = || self.shared.stopped.load(Ordering::SeqCst);

        let guard = self.lock()?;
        let (guard, _) = self
            .shared
            .progress
            .wait_timeout_while(guard, timeout, |machine| {
                get(machine).is_none() && !stopped()
            })
            .map_err(|_| AvssError::LockPoisoned)?;

        match get(&guard) {
            Some(value) => Ok(value),
            None if stopped() => Err(AvssError::Stopped),
            None => Err(AvssError::WaitTimeout(what, timeout)),
        }
    }

    pub fn final_share(&self) -> AvssResult<Option<SharePair<C>>> {
        Ok(self.lock()?.final_share().cloned())
    }

    /// `g^{x_i}` of this shareholder's final share
    pub fn share_public_key(&self) -> AvssResult<Option<C::Point>> {
        Ok(self.lock()?.share_public_key())
    }

    /// The distributed public key `g^{secret}`
    pub fn secret_public_key(&self) -> AvssResult<Option<C::Point>> {
        Ok(self.lock()?.public_key().cloned())
    }

    pub fn qual_set(&self) -> AvssResult<Option<Vec<Idx>>> {
        Ok(self.lock()?.qual().map(<[Idx]>::to_vec))
    }

    /// Alerts raised by this shareholder. Does not wait for the worker.
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.entries()
    }

    /// Stops the worker thread and waits for it to exit. Blocked waits return
    /// `AvssError::Stopped`.
    pub fn stop(&mut self) -> AvssResult<()> {
        let worker = match self.worker.take() {
            Some(worker) => worker,
            None => return Ok(()),
        };

        self.shared.stopped.store(true, Ordering::SeqCst);
        self.board.wake_all();
        {
            // waiters check the flag under the lock
            let _guard = self.shared.machine.lock();
            self.shared.progress.notify_all();
        }

        worker.join().map_err(|_| AvssError::WorkerPanicked)?;
        debug!(me = self.index, "node stopped");
        Ok(())
    }
}

impl<C, B> Drop for Node<C, B>
where
    C: Curve,
    B: BroadcastChannel,
{
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            error!(me = self.index, "could not stop node: {}", err);
        }
    }
}

fn run_worker<C: Curve, B: BroadcastChannel>(
    index: Idx,
    shared: &Shared<C>,
    board: &B,
    poll_interval: Duration,
) {
    let mut cursor = 0;
    while !shared.stopped.load(Ordering::SeqCst) {
        let len = board.wait_for_more(cursor, poll_interval);

        while cursor < len {
            let envelope = match board.get(cursor) {
                Some(envelope) => envelope,
                None => break,
            };
            cursor += 1;

            let outgoing = match shared.machine.lock() {
                Ok(mut machine) => machine.deliver(&envelope),
                Err(_) => {
                    error!(me = index, "state lock poisoned, stopping worker");
                    return;
                }
            };
            publish(index, board, outgoing);
            shared.progress.notify_all();
        }
    }
    debug!(me = index, cursor, "worker exiting");
}

fn publish<C: Curve, B: BroadcastChannel>(index: Idx, board: &B, payloads: Vec<Payload<C>>) {
    for payload in payloads {
        let opcode = payload.opcode();
        if let Err(err) = payload.seal(index).and_then(|envelope| board.broadcast(envelope)) {
            error!(me = index, %opcode, "could not broadcast: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{board::InMemoryBoard, primitives::Behavior, test_helpers::Driver};
    use threshold_primitives::{
        curve::bls12377::G1Curve,
        group::mul_generator,
        poly::{Eval, Poly},
    };

    type TestNode = Node<G1Curve, InMemoryBoard>;

    fn spawn(config: &Config, behaviors: &[(Idx, Behavior)]) -> (Arc<InMemoryBoard>, Vec<TestNode>) {
        let board = Arc::new(InMemoryBoard::new());
        let nodes = Driver::new(config, behaviors)
            .shareholders
            .into_iter()
            .map(|sh| Node::spawn(sh, board.clone(), config))
            .collect();
        (board, nodes)
    }

    #[test]
    fn threaded_dkg() {
        let config = Config {
            poll_interval_ms: 5,
            ..Config::new(7, 3, 2)
        };
        let (_board, mut nodes) = spawn(&config, &[(4, Behavior::Silent)]);

        for node in &nodes {
            node.broadcast_share_contributions().unwrap();
        }
        // publishing twice is a no-op
        assert!(!nodes[0].broadcast_share_contributions().unwrap());

        let timeout = Duration::from_secs(60);
        let qual = nodes[0].wait_for_qual(timeout).unwrap();
        let key = nodes[0].wait_for_public_key(timeout).unwrap();
        assert_eq!(qual.len(), 3);
        assert!(!qual.contains(&4));

        for node in &nodes {
            assert_eq!(node.wait_for_qual(timeout).unwrap(), qual);
            assert_eq!(node.wait_for_public_key(timeout).unwrap(), key);
            assert_eq!(node.secret_public_key().unwrap(), Some(key));
            assert_eq!(node.qual_set().unwrap(), Some(qual.clone()));
        }

        // the final shares interpolate to the secret behind the public key
        let shares: Vec<Eval<<G1Curve as Curve>::Scalar>> = [0, 3, 6]
            .iter()
            .map(|&i| nodes[i].final_share().unwrap().unwrap())
            .map(|share| Eval {
                index: share.index,
                value: share.value,
            })
            .collect();
        let secret = Poly::recover(3, shares).unwrap();
        assert_eq!(mul_generator::<G1Curve>(&secret), key);
        assert_eq!(
            nodes[3].share_public_key().unwrap(),
            Some(mul_generator::<G1Curve>(
                &nodes[3].final_share().unwrap().unwrap().value
            ))
        );

        for node in &mut nodes {
            assert!(node.alerts().is_empty());
            node.stop().unwrap();
        }
    }

    #[test]
    fn waits_time_out() {
        let config = Config {
            poll_interval_ms: 5,
            ..Config::new(1, 1, 0)
        };
        // a lone shareholder never gathers more than k + f endorsements
        let (_board, nodes) = spawn(&config, &[]);
        nodes[0].broadcast_share_contributions().unwrap();

        let err = nodes[0]
            .wait_for_qual(Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, AvssError::WaitTimeout("QUAL", _)));
        assert_eq!(nodes[0].qual_set().unwrap(), None);
        assert_eq!(nodes[0].final_share().unwrap(), None);
    }

    #[test]
    fn stopped_nodes_do_not_wait() {
        let config = Config {
            poll_interval_ms: 5,
            ..Config::new(4, 2, 1)
        };
        let (board, mut nodes) = spawn(&config, &[]);
        for node in &mut nodes {
            node.stop().unwrap();
            // stopping twice is fine
            node.stop().unwrap();
        }

        let err = nodes[1]
            .wait_for_public_key(Duration::from_secs(60))
            .unwrap_err();
        assert!(matches!(err, AvssError::Stopped));

        // stopped workers no longer react to the board
        nodes[0].broadcast_share_contributions().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(board.len(), 1);
    }
}

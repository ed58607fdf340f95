use crate::{
    board::InMemoryBoard,
    config::Config,
    node::Node,
    primitives::{Alert, AvssError, AvssResult, Behavior, Group, Shareholder},
};

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use threshold_primitives::{
    group::{mul_generator, Curve, Element},
    poly::Idx,
};
use tracing::{info, warn};

/// What a single shareholder ended up with
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub index: Idx,
    pub behavior: Behavior,
    pub qual: Option<Vec<Idx>>,
    /// hex encoded public key, if this shareholder reconstructed it
    pub public_key: Option<String>,
    /// hex encoded `g^{x_i}` of the final share
    pub share_public_key: Option<String>,
    pub alerts: Vec<Alert>,
}

/// Outcome of a local DKG run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkgSummary {
    pub n: usize,
    pub k: usize,
    pub f: usize,
    pub qual: Vec<Idx>,
    pub public_key: String,
    pub nodes: Vec<NodeSummary>,
}

fn encode<T: Serialize>(value: &T) -> AvssResult<String> {
    Ok(hex::encode(bincode::serialize(value)?))
}

/// Runs a full DKG between `config.n` threaded shareholders sharing one
/// in-memory board. Shareholder `i` behaves as `behaviors[i]`, or honestly
/// when the slice is shorter.
///
/// Fails if an honest shareholder does not reach the public key within
/// `config.wait_timeout()` or if honest shareholders disagree.
pub fn run_local<C: Curve>(config: &Config, behaviors: &[Behavior]) -> AvssResult<DkgSummary> {
    config.validate()?;
    if behaviors.len() > config.n {
        return Err(AvssError::IndexOutOfRange(
            (behaviors.len() - 1) as Idx,
            config.n,
        ));
    }
    let behavior_of = |i: usize| behaviors.get(i).copied().unwrap_or_default();

    let mut rng = ChaCha20Rng::from_entropy();
    let private_keys = (0..config.n)
        .map(|_| C::Scalar::rand(&mut rng))
        .collect::<Vec<_>>();
    let keys = private_keys.iter().map(mul_generator::<C>).collect();
    let group = Group::<C>::new(keys, config)?;

    let board = Arc::new(InMemoryBoard::new());
    let mut nodes = Vec::with_capacity(config.n);
    for (i, private_key) in private_keys.into_iter().enumerate() {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        let shareholder = Shareholder::new(
            i as Idx,
            private_key,
            group.clone(),
            behavior_of(i),
            ChaCha20Rng::from_seed(seed),
        )?;
        nodes.push(Node::spawn(shareholder, board.clone(), config));
    }
    info!(n = config.n, k = config.k, f = config.f, "started local DKG");

    for node in &nodes {
        node.broadcast_share_contributions()?;
    }

    let mut public_key: Option<C::Point> = None;
    let mut qual: Option<Vec<Idx>> = None;
    for node in nodes
        .iter()
        .filter(|node| behavior_of(node.index() as usize) == Behavior::Honest)
    {
        let key = node.wait_for_public_key(config.wait_timeout())?;
        let node_qual = node.wait_for_qual(config.wait_timeout())?;

        match &public_key {
            Some(expected) if expected != &key => {
                return Err(AvssError::Disagreement("public key"))
            }
            Some(_) => {}
            None => public_key = Some(key),
        }
        match &qual {
            Some(expected) if expected != &node_qual => {
                return Err(AvssError::Disagreement("QUAL"))
            }
            Some(_) => {}
            None => qual = Some(node_qual),
        }
    }

    // faulty shareholders can occupy every slot, the honest ones decide
    let (public_key, qual) = match (public_key, qual) {
        (Some(public_key), Some(qual)) => (public_key, qual),
        _ => return Err(AvssError::Disagreement("absence of honest shareholders")),
    };

    let mut summaries = Vec::with_capacity(nodes.len());
    for mut node in nodes {
        node.stop()?;
        let alerts = node.alerts();
        if !alerts.is_empty() {
            warn!(me = node.index(), count = alerts.len(), "shareholder raised alerts");
        }
        summaries.push(NodeSummary {
            index: node.index(),
            behavior: behavior_of(node.index() as usize),
            qual: node.qual_set()?,
            public_key: node.secret_public_key()?.as_ref().map(encode).transpose()?,
            share_public_key: node.share_public_key()?.as_ref().map(encode).transpose()?,
            alerts,
        });
    }

    info!(?qual, "local DKG finished");
    Ok(DkgSummary {
        n: config.n,
        k: config.k,
        f: config.f,
        qual,
        public_key: encode(&public_key)?,
        nodes: summaries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::ErrorCondition;
    use threshold_primitives::curve::bls12377::G1Curve;

    fn config(n: usize, k: usize, f: usize) -> Config {
        Config {
            poll_interval_ms: 5,
            wait_timeout_ms: 60_000,
            ..Config::new(n, k, f)
        }
    }

    #[test]
    fn honest_run() {
        let summary = run_local::<G1Curve>(&config(4, 2, 1), &[]).unwrap();

        assert_eq!((summary.n, summary.k, summary.f), (4, 2, 1));
        assert_eq!(summary.qual.len(), 2);
        assert_eq!(summary.nodes.len(), 4);
        for node in &summary.nodes {
            assert_eq!(node.behavior, Behavior::Honest);
            assert_eq!(node.qual.as_ref(), Some(&summary.qual));
            assert_eq!(node.public_key.as_ref(), Some(&summary.public_key));
            assert!(node.share_public_key.is_some());
            assert!(node.alerts.is_empty());
        }
        // every shareholder ends up with its own share
        assert_ne!(
            summary.nodes[0].share_public_key,
            summary.nodes[1].share_public_key
        );
    }

    #[test]
    fn faulty_dealer_is_reported() {
        let behaviors = [Behavior::Honest, Behavior::OmitBlinding];
        let summary = run_local::<G1Curve>(&config(4, 2, 1), &behaviors).unwrap();

        assert!(!summary.qual.contains(&1));
        assert_eq!(summary.nodes[1].behavior, Behavior::OmitBlinding);
        for node in summary.nodes.iter().filter(|node| node.index != 1) {
            assert!(node
                .alerts
                .iter()
                .any(|a| a.accused == 1 && a.condition == ErrorCondition::InconsistentShare));
        }
    }

    #[test]
    fn rejects_bad_input() {
        let err = run_local::<G1Curve>(&config(4, 3, 1), &[]).unwrap_err();
        assert!(matches!(err, AvssError::InvalidParameters { .. }));

        let err = run_local::<G1Curve>(&config(1, 1, 0), &[Behavior::Honest; 2]).unwrap_err();
        assert!(matches!(err, AvssError::IndexOutOfRange(1, 1)));
    }
}

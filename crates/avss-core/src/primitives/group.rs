use crate::{
    config::Config,
    primitives::{AvssError, AvssResult},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use threshold_primitives::{group::Curve, poly::Idx};

/// Participant is a shareholder of the DKG. Each participant is identified by
/// an index and the public key share contributions are encrypted to.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct Participant<C: Curve>(Idx, C::Point);

impl<C: Curve> Participant<C> {
    pub fn new(index: Idx, public: C::Point) -> Self {
        Self(index, public)
    }

    /// Returns the participant's index
    pub fn id(&self) -> Idx {
        self.0
    }

    /// Returns the participant's encryption key
    pub fn key(&self) -> &C::Point {
        &self.1
    }
}

/// A Group is the list of participants together with the reconstruction
/// threshold `k` and the number of tolerated faults `f`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct Group<C: Curve> {
    /// The participants, participant `i` is stored at position `i`
    pub participants: Vec<Participant<C>>,
    /// The minimum number of shares needed to reconstruct the secret
    pub threshold: usize,
    /// The maximum number of faulty participants
    pub faults: usize,
}

impl<C> Group<C>
where
    C: Curve,
{
    /// Creates a new group from the encryption keys of all shareholders,
    /// ordered by index.
    pub fn new(keys: Vec<C::Point>, config: &Config) -> AvssResult<Group<C>> {
        config.validate()?;
        if keys.len() != config.n {
            return Err(AvssError::KeyCountMismatch(keys.len(), config.n));
        }

        let participants = keys
            .into_iter()
            .enumerate()
            .map(|(i, public)| Participant::new(i as Idx, public))
            .collect();

        Ok(Self {
            participants,
            threshold: config.k,
            faults: config.f,
        })
    }

    /// Returns the number of participants in the group
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Checks if the group is empty
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn contains_index(&self, idx: Idx) -> bool {
        (idx as usize) < self.len()
    }

    /// Gets the encryption key of the participant at `idx`
    pub fn key(&self, idx: Idx) -> Option<&C::Point> {
        self.participants.get(idx as usize).map(Participant::key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threshold_primitives::{curve::bls12377::G1Curve, group::Element};

    fn keys(n: usize) -> Vec<<G1Curve as Curve>::Point> {
        (0..n)
            .map(|_| Element::rand(&mut rand::thread_rng()))
            .collect()
    }

    #[test]
    fn group_index() {
        let keys = keys(5);
        let group = Group::<G1Curve>::new(keys.clone(), &Config::new(5, 1, 0)).unwrap();
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(group.key(i as Idx), Some(key));
            assert_eq!(group.participants[i].id(), i as Idx);
        }
        assert!(!group.contains_index(5));
        assert_eq!(group.key(5), None);
    }

    #[test]
    fn key_count_must_match() {
        let err = Group::<G1Curve>::new(keys(4), &Config::new(5, 1, 0)).unwrap_err();
        assert!(matches!(err, AvssError::KeyCountMismatch(4, 5)));
    }
}

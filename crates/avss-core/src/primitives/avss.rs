//! The shareholder state machine of the asynchronous Pedersen DKG.
//!
//! Every shareholder deals a Pedersen-committed sharing of a random secret,
//! judges the contributions it receives and announces its judgments once it
//! accepted `n - f` of them. Accused dealers rebut by revealing the disputed
//! share. The first `f + 1` dealers endorsed by more than `k + f` shareholders
//! form QUAL, whose contributions sum up to the distributed secret. The public
//! key `g^{secret}` is assembled from proofs revealing `g^{a_0}` of QUAL
//! members, and for the members that stay silent, from proofs of the shares
//! they dealt which are interpolated in the exponent.
use crate::{
    config::Config,
    primitives::{
        alert::{Alert, AlertLog},
        errors::{AvssError, AvssResult, ProtocolError},
        group::Group,
        status::{Status, StatusMatrix},
        types::*,
    },
};

use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::{
    cell::OnceCell,
    collections::{BTreeMap, BTreeSet},
};
use threshold_primitives::{
    ecies,
    group::{mul_generator, pedersen, Curve, Element, Point, PrimeOrder},
    poly::{pedersen_commit, Eval, Idx, Poly, PrivatePoly, PublicPoly},
    zkp::PedersenProof,
};
use tracing::{debug, error, info, trace, warn};

/// How a shareholder deviates from the protocol. Anything but `Honest` is
/// only meant for exercising fault tolerance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    #[default]
    Honest,
    /// Publishes `g^{a_j}` instead of `g^{a_j} h^{b_j}` as commitments
    OmitBlinding,
    /// Processes messages but never broadcasts anything
    Silent,
    /// Never deals a contribution but takes part in everything else
    WithholdContribution,
}

/// A participant of the DKG. Handlers are synchronous: the caller feeds every
/// envelope of the broadcast log, in order, to `deliver` and publishes the
/// payloads it returns.
pub struct Shareholder<C: Curve> {
    index: Idx,
    private_key: C::Scalar,
    group: Group<C>,
    behavior: Behavior,
    rng: ChaCha20Rng,

    /// secret polynomial, `f1(0)` is this dealer's part of the secret
    f1: PrivatePoly<C>,
    /// blinding polynomial of the Pedersen commitments
    f2: PrivatePoly<C>,
    contributed: bool,

    /// dealers whose contribution was processed, valid or not
    seen: Vec<bool>,
    commitments: Vec<Option<PublicPoly<C>>>,
    /// valid share pairs received from each dealer
    contributions: Vec<Option<SharePair<C>>>,
    our_statuses: Vec<Option<Status>>,
    vector_sent: bool,
    received_verifications: StatusMatrix,

    qual_candidates: Vec<Idx>,
    qual: OnceCell<Vec<Idx>>,
    final_share: Option<SharePair<C>>,

    /// `g^{a_{j,0}}` for QUAL members
    public_a0: Vec<Option<C::Point>>,
    proof_set: BTreeSet<Idx>,
    r_set: OnceCell<BTreeSet<Idx>>,
    /// `g^{s_{i,j}}` for every `i` in R, proven by shareholder `j`
    proven_shares: Vec<Option<BTreeMap<Idx, C::Point>>>,
    u_set: BTreeSet<Idx>,
    public_key: OnceCell<C::Point>,

    alerts: AlertLog,
    outbox: Vec<Payload<C>>,
}

impl<C: Curve> Shareholder<C> {
    /// Creates the shareholder at `index` and samples its two polynomials of
    /// degree `k - 1` from `rng`.
    pub fn new(
        index: Idx,
        private_key: C::Scalar,
        group: Group<C>,
        behavior: Behavior,
        mut rng: ChaCha20Rng,
    ) -> AvssResult<Self> {
        let n = group.len();
        Config::new(n, group.threshold, group.faults).validate()?;

        let key = group
            .key(index)
            .ok_or(AvssError::IndexOutOfRange(index, n))?;
        if &mul_generator::<C>(&private_key) != key {
            return Err(AvssError::PrivateKeyMismatch(index));
        }

        let degree = group.threshold - 1;
        let f1 = PrivatePoly::<C>::new_from(degree, &mut rng);
        let f2 = PrivatePoly::<C>::new_from(degree, &mut rng);

        Ok(Self {
            index,
            private_key,
            group,
            behavior,
            rng,
            f1,
            f2,
            contributed: false,
            seen: vec![false; n],
            commitments: vec![None; n],
            contributions: vec![None; n],
            our_statuses: vec![None; n],
            vector_sent: false,
            received_verifications: StatusMatrix::new(n),
            qual_candidates: Vec::new(),
            qual: OnceCell::new(),
            final_share: None,
            public_a0: vec![None; n],
            proof_set: BTreeSet::new(),
            r_set: OnceCell::new(),
            proven_shares: vec![None; n],
            u_set: BTreeSet::new(),
            public_key: OnceCell::new(),
            alerts: AlertLog::new(),
            outbox: Vec::new(),
        })
    }

    pub fn index(&self) -> Idx {
        self.index
    }

    /// The alert log of this shareholder. Clones share the same entries.
    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    pub fn qual(&self) -> Option<&[Idx]> {
        self.qual.get().map(Vec::as_slice)
    }

    /// The dealers of QUAL which did not prove their `g^{a_0}` in time
    pub fn r_set(&self) -> Option<&BTreeSet<Idx>> {
        self.r_set.get()
    }

    /// `(x_i, x_i')`, available once QUAL is frozen and every contribution of
    /// QUAL was accepted
    pub fn final_share(&self) -> Option<&SharePair<C>> {
        self.final_share.as_ref()
    }

    /// `g^{x_i}`
    pub fn share_public_key(&self) -> Option<C::Point> {
        self.final_share
            .as_ref()
            .map(|share| mul_generator::<C>(&share.value))
    }

    /// `Y = g^{secret}`
    pub fn public_key(&self) -> Option<&C::Point> {
        self.public_key.get()
    }

    /// This shareholder's own judgment of each dealer
    pub fn our_statuses(&self) -> &[Option<Status>] {
        &self.our_statuses
    }

    /// The verification vectors received so far, rebuttals applied
    pub fn received_verifications(&self) -> &StatusMatrix {
        &self.received_verifications
    }

    /// Builds the share contribution of this dealer: the commitments to its
    /// polynomials and one encrypted share pair per shareholder. Returns
    /// `None` if it was already built.
    pub fn share_contributions(&mut self) -> AvssResult<Option<Payload<C>>> {
        if self.contributed {
            return Ok(None);
        }
        self.contributed = true;

        if matches!(
            self.behavior,
            Behavior::Silent | Behavior::WithholdContribution
        ) {
            debug!(me = self.index, "withholding share contribution");
            return Ok(None);
        }

        let commitments = match self.behavior {
            Behavior::OmitBlinding => self.f1.commit_with(&C::point()),
            _ => pedersen_commit::<C>(&self.f1, &self.f2),
        };

        let mut shares = Vec::with_capacity(self.group.len());
        for participant in &self.group.participants {
            let pair = evaluate::<C>(&self.f1, &self.f2, participant.id());
            let plaintext = bincode::serialize(&pair)?;
            let secret = ecies::encrypt::<C, _>(participant.key(), &plaintext, &mut self.rng)
                .map_err(AvssError::Encryption)?;
            shares.push(EncryptedShare {
                share_idx: participant.id(),
                secret,
            });
        }

        debug!(me = self.index, "built share contribution");
        Ok(Some(Payload::ShareContribution(BundledContribution {
            commitments,
            shares,
        })))
    }

    /// Processes one entry of the broadcast log and returns the payloads to
    /// broadcast in response. Faults of the sender are recorded as alerts and
    /// never interrupt processing.
    pub fn deliver(&mut self, envelope: &Envelope) -> Vec<Payload<C>> {
        let sender = envelope.sender;
        trace!(me = self.index, sender, opcode = envelope.opcode, "delivering");

        if let Err(err) = self.handle(envelope) {
            let condition = err.condition();
            warn!(me = self.index, sender, %condition, "{}", err);
            self.alerts.record(Alert {
                reporter: self.index,
                accused: sender,
                condition,
            });
        }

        let outgoing = std::mem::take(&mut self.outbox);
        if self.behavior == Behavior::Silent {
            if !outgoing.is_empty() {
                trace!(me = self.index, count = outgoing.len(), "withholding messages");
            }
            return Vec::new();
        }
        outgoing
    }

    fn handle(&mut self, envelope: &Envelope) -> Result<(), ProtocolError> {
        let sender = envelope.sender;
        let payload = envelope.open::<C>()?;
        if !self.group.contains_index(sender) {
            return Err(ProtocolError::UnknownSender(sender));
        }

        match payload {
            Payload::ShareContribution(bundle) => self.process_contribution(sender, bundle),
            Payload::Verification(vector) => self.process_verification(sender, vector),
            Payload::Rebuttal(rebuttal) => self.process_rebuttal(sender, rebuttal),
            Payload::ZkProof(proof) => self.process_zk_proof(sender, proof),
            Payload::BulkZkProof(bulk) => self.process_bulk_proof(sender, bulk),
        }
    }

    fn emit(&mut self, payload: Payload<C>) {
        self.outbox.push(payload);
    }

    fn n(&self) -> usize {
        self.group.len()
    }

    fn k(&self) -> usize {
        self.group.threshold
    }

    fn f(&self) -> usize {
        self.group.faults
    }

    fn process_contribution(
        &mut self,
        dealer: Idx,
        bundle: BundledContribution<C>,
    ) -> Result<(), ProtocolError> {
        let d = dealer as usize;
        if self.seen[d] {
            return Err(ProtocolError::Duplicate(Opcode::ShareContribution));
        }
        self.seen[d] = true;

        match self.check_contribution(dealer, bundle) {
            Ok(pair) => {
                debug!(me = self.index, dealer, "accepted share contribution");
                self.our_statuses[d] = Some(Status::Success);
                self.contributions[d] = Some(pair);
                self.maybe_send_vector();
                Ok(())
            }
            Err(err) => {
                self.our_statuses[d] = Some(Status::Complaint);
                Err(err)
            }
        }
    }

    fn check_contribution(
        &mut self,
        dealer: Idx,
        bundle: BundledContribution<C>,
    ) -> Result<SharePair<C>, ProtocolError> {
        let BundledContribution {
            commitments,
            shares,
        } = bundle;
        let d = dealer as usize;

        let pair = match self.decrypt_share(&shares) {
            Ok(pair) => pair,
            Err(err) => {
                // a rebuttal of our complaint is checked against these
                if self.check_commitments(&commitments).is_ok() {
                    self.commitments[d] = Some(commitments);
                }
                return Err(err);
            }
        };
        self.check_commitments(&commitments)?;
        let commitments = &*self.commitments[d].insert(commitments);

        if pair.index != self.index {
            return Err(ProtocolError::WrongShareIndex(pair.index, self.index));
        }
        if !share_correct::<C>(&pair, self.index, commitments) {
            return Err(ProtocolError::ShareMismatch);
        }

        Ok(pair)
    }

    fn check_commitments(&self, commitments: &PublicPoly<C>) -> Result<(), ProtocolError> {
        if commitments.len() != self.k() {
            return Err(ProtocolError::WrongCommitmentCount(
                commitments.len(),
                self.k(),
            ));
        }

        let identity = C::Point::zero();
        for (i, point) in commitments.coefficients().iter().enumerate() {
            if point == &identity || !point.is_on_curve() || !point.in_correct_subgroup() {
                return Err(ProtocolError::InvalidCommitmentPoint(i));
            }
        }

        Ok(())
    }

    fn decrypt_share(&self, shares: &[EncryptedShare<C>]) -> Result<SharePair<C>, ProtocolError> {
        let encrypted = shares
            .iter()
            .find(|share| share.share_idx == self.index)
            .ok_or(ProtocolError::MissingShare)?;

        let plaintext = ecies::decrypt::<C>(&self.private_key, &encrypted.secret)
            .map_err(ProtocolError::Undecryptable)?;

        // scalars outside of [0, q) do not decode
        bincode::deserialize(&plaintext).map_err(ProtocolError::MalformedShare)
    }

    fn maybe_send_vector(&mut self) {
        if self.vector_sent {
            return;
        }

        let successes = self
            .our_statuses
            .iter()
            .filter(|status| **status == Some(Status::Success))
            .count();
        if successes >= self.n() - self.f() {
            self.vector_sent = true;
            debug!(me = self.index, successes, "broadcasting verification vector");
            let statuses = self.our_statuses.clone();
            self.emit(Payload::Verification(VerificationVector { statuses }));
        }
    }

    fn process_verification(
        &mut self,
        reporter: Idx,
        vector: VerificationVector,
    ) -> Result<(), ProtocolError> {
        if self.received_verifications.has_row(reporter) {
            return Err(ProtocolError::Duplicate(Opcode::Verification));
        }
        if vector.statuses.len() != self.n() {
            return Err(ProtocolError::WrongVectorLength(
                vector.statuses.len(),
                self.n(),
            ));
        }

        let accuses_us = vector.statuses[self.index as usize] == Some(Status::Complaint);
        self.received_verifications
            .set_row(reporter, vector.statuses);

        if accuses_us {
            debug!(me = self.index, accuser = reporter, "rebutting complaint");
            let share = evaluate::<C>(&self.f1, &self.f2, reporter);
            self.emit(Payload::Rebuttal(Rebuttal {
                accuser: reporter,
                share,
            }));
        }

        self.try_qual();
        Ok(())
    }

    fn process_rebuttal(&mut self, accused: Idx, rebuttal: Rebuttal<C>) -> Result<(), ProtocolError> {
        let accuser = rebuttal.accuser;
        if !self.group.contains_index(accuser) {
            return Err(ProtocolError::BadRebuttal("accuser is not a shareholder"));
        }
        if !self.received_verifications.has_row(accuser) {
            return Err(ProtocolError::BadRebuttal(
                "accuser has not announced a verification vector",
            ));
        }
        if self.received_verifications.get(accuser, accused) != Some(Status::Complaint) {
            return Err(ProtocolError::BadRebuttal(
                "accuser does not complain about the sender",
            ));
        }
        let commitments = self.commitments[accused as usize]
            .as_ref()
            .ok_or(ProtocolError::BadRebuttal("commitments of the sender are unknown"))?;

        let share = rebuttal.share;
        if share.index != accuser {
            return Err(ProtocolError::WrongShareIndex(share.index, accuser));
        }
        if !share_correct::<C>(&share, accuser, commitments) {
            return Err(ProtocolError::ShareMismatch);
        }

        debug!(me = self.index, accused, accuser, "rebuttal accepted");
        self.received_verifications
            .set(accuser, accused, Status::Success);
        if accuser == self.index {
            self.our_statuses[accused as usize] = Some(Status::Success);
            self.contributions[accused as usize] = Some(share);
        }

        self.try_qual();
        self.try_final_share();
        Ok(())
    }

    /// Adds every dealer endorsed by more than `k + f` vectors to QUAL until
    /// it holds `f + 1` members, at which point it is frozen.
    fn try_qual(&mut self) {
        if self.qual.get().is_some() {
            return;
        }

        let (k, f) = (self.k(), self.f());
        for dealer in 0..self.n() as Idx {
            if self.qual_candidates.len() == f + 1 {
                break;
            }
            if self.qual_candidates.contains(&dealer) {
                continue;
            }
            if self.received_verifications.successes_for(dealer) > k + f {
                self.qual_candidates.push(dealer);
            }
        }

        if self.qual_candidates.len() < f + 1 {
            return;
        }

        let mut qual = self.qual_candidates.clone();
        qual.sort_unstable();
        info!(me = self.index, ?qual, "QUAL frozen");
        let in_qual = qual.contains(&self.index);
        let _ = self.qual.set(qual);

        self.try_final_share();

        if in_qual {
            match PedersenProof::<C>::prove(self.f1.public_key(), self.f2.public_key(), &mut self.rng)
            {
                Ok(proof) => self.emit(Payload::ZkProof(proof)),
                Err(err) => error!(me = self.index, "could not prove secret contribution: {}", err),
            }
        }
    }

    fn try_final_share(&mut self) {
        if self.final_share.is_some() {
            return;
        }
        let qual = match self.qual.get() {
            Some(qual) => qual,
            None => return,
        };

        let mut value = C::Scalar::zero();
        let mut blinding = C::Scalar::zero();
        for &dealer in qual {
            match &self.contributions[dealer as usize] {
                Some(pair) => {
                    value.add(&pair.value);
                    blinding.add(&pair.blinding);
                }
                None => {
                    debug!(me = self.index, dealer, "final share deferred, contribution missing");
                    return;
                }
            }
        }

        debug!(me = self.index, "computed final share");
        self.final_share = Some(SharePair {
            index: self.index,
            value,
            blinding,
        });
    }

    fn process_zk_proof(
        &mut self,
        sender: Idx,
        proof: PedersenProof<C>,
    ) -> Result<(), ProtocolError> {
        let qual = self
            .qual
            .get()
            .ok_or(ProtocolError::StateViolation("QUAL is not frozen yet"))?;
        if !qual.contains(&sender) {
            return Err(ProtocolError::StateViolation("sender is not part of QUAL"));
        }
        let commitments = self.commitments[sender as usize]
            .as_ref()
            .ok_or(ProtocolError::StateViolation("commitments of the sender are unknown"))?;
        if self.proof_set.contains(&sender) {
            return Err(ProtocolError::Duplicate(Opcode::ZkProof));
        }

        proof
            .verify(commitments.public_key())
            .map_err(ProtocolError::InvalidProof)?;

        let qual_len = qual.len();
        self.public_a0[sender as usize] = Some(proof.public_a);
        self.proof_set.insert(sender);
        debug!(me = self.index, sender, proven = self.proof_set.len(), "secret contribution proven");

        if self.r_set.get().is_none() && self.proof_set.len() == qual_len - self.f() {
            self.determine_r();
        }

        Ok(())
    }

    /// Freezes `R = QUAL \ proof_set` and proves the shares received from
    /// the members of `R`
    fn determine_r(&mut self) {
        let qual = match self.qual.get() {
            Some(qual) => qual,
            None => return,
        };
        let r = qual
            .iter()
            .filter(|dealer| !self.proof_set.contains(dealer))
            .copied()
            .collect::<BTreeSet<_>>();
        debug!(me = self.index, ?r, "R determined");

        let _ = self.r_set.set(r.clone());

        let mut proofs = BTreeMap::new();
        for dealer in r {
            let pair = match &self.contributions[dealer as usize] {
                Some(pair) => pair,
                None => {
                    warn!(me = self.index, dealer, "no share of a member of R, skipping bulk proof");
                    return;
                }
            };
            match PedersenProof::<C>::prove(&pair.value, &pair.blinding, &mut self.rng) {
                Ok(proof) => {
                    proofs.insert(dealer, proof);
                }
                Err(err) => {
                    error!(me = self.index, "could not prove share: {}", err);
                    return;
                }
            }
        }

        self.emit(Payload::BulkZkProof(BulkProof { proofs }));
    }

    fn process_bulk_proof(&mut self, sender: Idx, bulk: BulkProof<C>) -> Result<(), ProtocolError> {
        if self.public_key.get().is_some() {
            trace!(me = self.index, sender, "public key known, ignoring bulk proof");
            return Ok(());
        }
        if self.commitments[sender as usize].is_none() {
            return Err(ProtocolError::StateViolation(
                "commitments of the sender are unknown",
            ));
        }
        let r = self
            .r_set
            .get()
            .ok_or(ProtocolError::StateViolation("R is not determined yet"))?;

        if !bulk.proofs.keys().eq(r.iter()) {
            return Err(ProtocolError::InvalidBulkProof(
                "proven dealers do not match R",
            ));
        }

        let mut points = BTreeMap::new();
        for (&dealer, proof) in &bulk.proofs {
            let commitments = self.commitments[dealer as usize].as_ref().ok_or(
                ProtocolError::InvalidBulkProof("commitments of a member of R are unknown"),
            )?;
            // D_{i,j} = prod_t C_{i,t}^{(j+1)^t}
            let expected = commitments.eval(sender).value;
            proof.verify(&expected).map_err(|_| {
                ProtocolError::InvalidBulkProof("proof does not open the sender's share")
            })?;
            points.insert(dealer, proof.public_a.clone());
        }

        if self.u_set.contains(&sender) {
            return Err(ProtocolError::Duplicate(Opcode::BulkZkProof));
        }

        self.proven_shares[sender as usize] = Some(points);
        self.u_set.insert(sender);
        debug!(me = self.index, sender, proven = self.u_set.len(), "bulk proof accepted");

        if self.u_set.len() == self.k() {
            self.reconstruct_public_key();
        }

        Ok(())
    }

    /// Interpolates `g^{a_{i,0}}` of every member `i` of R from the shares
    /// proven by `U`, then sums up the contributions of QUAL.
    fn reconstruct_public_key(&mut self) {
        let (qual, r) = match (self.qual.get(), self.r_set.get()) {
            (Some(qual), Some(r)) => (qual, r),
            _ => return,
        };
        let k = self.group.threshold;

        for &dealer in r {
            let shares = self
                .u_set
                .iter()
                .filter_map(|&j| {
                    let point = self.proven_shares[j as usize].as_ref()?.get(&dealer)?;
                    Some(Eval {
                        index: j,
                        value: point.clone(),
                    })
                })
                .collect::<Vec<_>>();

            match Poly::<C::Point>::recover(k, shares) {
                Ok(a0) => self.public_a0[dealer as usize] = Some(a0),
                Err(err) => {
                    error!(me = self.index, dealer, "could not interpolate: {}", err);
                    return;
                }
            }
        }

        let mut key = C::Point::zero();
        for &dealer in qual {
            match &self.public_a0[dealer as usize] {
                Some(a0) => key.add(a0),
                None => {
                    error!(me = self.index, dealer, "public contribution missing");
                    return;
                }
            }
        }

        info!(me = self.index, "public key reconstructed");
        let _ = self.public_key.set(key);
    }

    #[cfg(test)]
    pub(crate) fn secret_contribution(&self) -> &C::Scalar {
        self.f1.public_key()
    }
}

/// Returns `(f1(idx + 1), f2(idx + 1))`
fn evaluate<C: Curve>(f1: &PrivatePoly<C>, f2: &PrivatePoly<C>, idx: Idx) -> SharePair<C> {
    SharePair {
        index: idx,
        value: f1.eval(idx).value,
        blinding: f2.eval(idx).value,
    }
}

/// Checks `g^{s} h^{s'} = prod_t C_t^{(idx+1)^t}`
fn share_correct<C: Curve>(pair: &SharePair<C>, idx: Idx, commitments: &PublicPoly<C>) -> bool {
    commitments.eval(idx).value == pedersen::<C>(&pair.value, &pair.blinding)
}

use serde::{Deserialize, Serialize};
use std::fmt;
use threshold_primitives::poly::Idx;

/// A `Status` holds the claim of a validity or not of a dealer's contribution
/// from the point of view of a shareholder. Unknown judgments are represented
/// with `None` wherever a status is stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Hash, Eq)]
pub enum Status {
    Success,
    Complaint,
}

/// A `StatusMatrix` stores the verification vectors announced by every
/// shareholder. Row `i` is `None` until shareholder `i` broadcasts its vector,
/// cell `(i, j)` is then `i`'s judgment of dealer `j`.
///
/// # Examples
///
/// ```rust
/// use avss_core::primitives::status::{Status, StatusMatrix};
///
/// let mut matrix = StatusMatrix::new(3);
/// matrix.set_row(1, vec![Some(Status::Success), None, Some(Status::Complaint)]);
///
/// assert_eq!(matrix.get(1, 2), Some(Status::Complaint));
/// assert_eq!(matrix.get(0, 2), None);
///
/// // a rebuttal flips a complaint
/// matrix.set(1, 2, Status::Success);
/// assert_eq!(matrix.successes_for(2), 1);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub struct StatusMatrix(Vec<Option<Vec<Option<Status>>>>);

impl fmt::Display for StatusMatrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (reporter, row) in self.0.iter().enumerate() {
            let cells = match row {
                Some(row) => row
                    .iter()
                    .map(|s| match s {
                        Some(Status::Success) => '1',
                        Some(Status::Complaint) => '0',
                        None => '?',
                    })
                    .collect::<String>(),
                None => "-".to_string(),
            };
            writeln!(f, "-> shareholder {}: [{}]", reporter, cells)?;
        }
        Ok(())
    }
}

impl StatusMatrix {
    /// Returns a matrix for `n` shareholders where no vector was received yet
    pub fn new(n: usize) -> Self {
        Self(vec![None; n])
    }

    /// Returns `true` if a vector of `reporter` was stored
    ///
    /// # Panics
    ///
    /// If the `reporter` index is greater than the number of shareholders
    pub fn has_row(&self, reporter: Idx) -> bool {
        self.0[reporter as usize].is_some()
    }

    /// Stores the vector announced by `reporter`
    ///
    /// # Panics
    ///
    /// If the `reporter` index is greater than the number of shareholders
    pub fn set_row(&mut self, reporter: Idx, row: Vec<Option<Status>>) {
        self.0[reporter as usize] = Some(row);
    }

    /// Gets `reporter`'s judgment of `dealer`, `None` if unknown
    pub fn get(&self, reporter: Idx, dealer: Idx) -> Option<Status> {
        self.0
            .get(reporter as usize)?
            .as_ref()?
            .get(dealer as usize)
            .copied()
            .flatten()
    }

    /// Overwrites the judgment of `dealer` in the stored vector of `reporter`.
    /// Does nothing if `reporter` has not announced a vector.
    pub fn set(&mut self, reporter: Idx, dealer: Idx, status: Status) {
        if let Some(Some(row)) = self.0.get_mut(reporter as usize) {
            if let Some(cell) = row.get_mut(dealer as usize) {
                *cell = Some(status);
            }
        }
    }

    /// Returns the number of announced vectors which mark `dealer` as valid
    pub fn successes_for(&self, dealer: Idx) -> usize {
        (0..self.0.len() as Idx)
            .filter(|&reporter| self.get(reporter, dealer) == Some(Status::Success))
            .count()
    }
}

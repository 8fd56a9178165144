use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a state inside the machine that created it.
///
/// Ids are non-owning links: successors, Choice targets and Catcher targets
/// all refer to states through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub(crate) usize);

impl StateId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

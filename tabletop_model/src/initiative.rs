// Initiative order for one zone.
//
// Entries are kept in turn order and may repeat a token (a creature acting
// twice per round). Single-entry updates arrive as `(token, index)` pairs;
// because concurrent edits on other peers can shift indices, `update_entry`
// first trusts the index if it still names the same token, otherwise falls
// back to searching by token id. If the search is ambiguous the update is
// refused rather than applied to a guessed entry.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::types::Guid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInitiative {
    pub token_id: Guid,
    pub holding: bool,
    pub state: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeList {
    pub zone_id: Guid,
    pub entries: Vec<TokenInitiative>,
    pub current: Option<usize>,
    pub round: u32,
    pub hide_npcs: bool,
}

impl InitiativeList {
    pub fn new(zone_id: Guid) -> Self {
        Self {
            zone_id,
            entries: Vec::new(),
            current: None,
            round: 0,
            hide_npcs: false,
        }
    }

    pub fn add(&mut self, token_id: Guid) {
        self.entries.push(TokenInitiative {
            token_id,
            holding: false,
            state: None,
        });
    }

    /// Every index at which `token_id` appears.
    pub fn indices_of(&self, token_id: Guid) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.token_id == token_id)
            .map(|(i, _)| i)
            .collect()
    }

    /// Drop every entry for a token (used when the token leaves the zone).
    pub fn remove_token(&mut self, token_id: Guid) {
        self.entries.retain(|e| e.token_id != token_id);
        if self.current.is_some_and(|c| c >= self.entries.len()) {
            self.current = None;
        }
    }

    /// Resolve the entry an `(token, index)` update refers to.
    ///
    /// Returns `Ok(None)` when the token no longer appears at all (a
    /// torn-down entity; callers treat it as a no-op) and an error when the
    /// token appears more than once and the index no longer matches.
    pub fn resolve(&self, token_id: Guid, index: usize) -> Result<Option<usize>, ModelError> {
        if self.entries.get(index).is_some_and(|e| e.token_id == token_id) {
            return Ok(Some(index));
        }
        let found = self.indices_of(token_id);
        match found.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(*only)),
            _ => Err(ModelError::AmbiguousInitiative {
                token: token_id,
                matches: found.len(),
            }),
        }
    }

    /// Update the holding flag and state of one entry. Returns whether an
    /// entry was changed.
    pub fn update_entry(
        &mut self,
        token_id: Guid,
        index: usize,
        holding: bool,
        state: Option<String>,
    ) -> Result<bool, ModelError> {
        let Some(i) = self.resolve(token_id, index)? else {
            return Ok(false);
        };
        let entry = &mut self.entries[i];
        entry.holding = holding;
        entry.state = state;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_with(tokens: &[Guid]) -> InitiativeList {
        let mut list = InitiativeList::new(Guid::from_u128(1));
        for t in tokens {
            list.add(*t);
        }
        list
    }

    #[test]
    fn update_uses_matching_index() {
        let a = Guid::from_u128(10);
        let mut list = list_with(&[a, a]);
        assert_eq!(list.update_entry(a, 1, true, None), Ok(true));
        assert!(!list.entries[0].holding);
        assert!(list.entries[1].holding);
    }

    #[test]
    fn stale_index_falls_back_to_unique_search() {
        let a = Guid::from_u128(10);
        let b = Guid::from_u128(11);
        let mut list = list_with(&[b, a]);
        assert_eq!(list.update_entry(a, 0, false, Some("Dazed".into())), Ok(true));
        assert_eq!(list.entries[1].state.as_deref(), Some("Dazed"));
        assert_eq!(list.entries[0].state, None);
    }

    #[test]
    fn ambiguous_search_is_refused() {
        let a = Guid::from_u128(10);
        let b = Guid::from_u128(11);
        let mut list = list_with(&[a, b, a]);
        let before = list.clone();
        let err = list.update_entry(a, 1, true, None).unwrap_err();
        assert_eq!(
            err,
            ModelError::AmbiguousInitiative {
                token: a,
                matches: 2
            }
        );
        assert_eq!(list, before);
    }

    #[test]
    fn missing_token_is_a_no_op() {
        let mut list = list_with(&[Guid::from_u128(1)]);
        assert_eq!(
            list.update_entry(Guid::from_u128(99), 0, true, None),
            Ok(false)
        );
    }

    #[test]
    fn removing_token_resets_out_of_range_cursor() {
        let a = Guid::from_u128(10);
        let b = Guid::from_u128(11);
        let mut list = list_with(&[a, b]);
        list.current = Some(1);
        list.remove_token(b);
        assert_eq!(list.current, None);
        assert_eq!(list.entries.len(), 1);
    }
}

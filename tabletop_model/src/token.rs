// Tokens: the placeable game pieces of a zone.
//
// A token's `z_order` orders it for painting and selection within its zone.
// Clients may create tokens with any placeholder z-order; the server assigns
// the authoritative value when it first sees a token (see the authority's
// `putToken` handling).
//
// `TokenUpdate` is the typed form of the `updateTokenProperty` command's
// `(kind, args)` pair. Keeping the kind as a separate `TokenUpdateKind` lets
// the wire carry the kind tag and the arguments positionally while the model
// only ever sees a fully-typed update.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::{AssetId, Guid, Layer};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: Guid,
    pub name: String,
    pub gm_name: Option<String>,
    pub owners: BTreeSet<String>,
    pub layer: Layer,
    pub x: i32,
    pub y: i32,
    pub z_order: i32,
    pub facing: Option<i32>,
    pub visible: bool,
    pub image: Option<AssetId>,
    pub properties: BTreeMap<String, String>,
}

impl Token {
    /// A new visible token on the token layer with a fresh id and a
    /// placeholder z-order of zero.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Guid::new(),
            name: name.into(),
            gm_name: None,
            owners: BTreeSet::new(),
            layer: Layer::Token,
            x: 0,
            y: 0,
            z_order: 0,
            facing: None,
            visible: true,
            image: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn is_owned_by(&self, player: &str) -> bool {
        self.owners.is_empty() || self.owners.contains(player)
    }

    /// Apply a typed property update in place.
    pub fn apply(&mut self, update: TokenUpdate) {
        match update {
            TokenUpdate::SetZOrder(z) => self.z_order = z,
            TokenUpdate::SetPosition { x, y } => {
                self.x = x;
                self.y = y;
            }
            TokenUpdate::SetName(name) => self.name = name,
            TokenUpdate::SetGmName(name) => self.gm_name = name,
            TokenUpdate::SetVisible(visible) => self.visible = visible,
            TokenUpdate::SetLayer(layer) => self.layer = layer,
            TokenUpdate::SetFacing(facing) => self.facing = facing,
            TokenUpdate::SetProperty { name, value } => {
                self.properties.insert(name, value);
            }
            TokenUpdate::RemoveProperty(name) => {
                self.properties.remove(&name);
            }
            TokenUpdate::SetOwners(owners) => self.owners = owners,
        }
    }
}

/// Discriminant of a `TokenUpdate`, carried on the wire ahead of its args.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TokenUpdateKind {
    SetZOrder,
    SetPosition,
    SetName,
    SetGmName,
    SetVisible,
    SetLayer,
    SetFacing,
    SetProperty,
    RemoveProperty,
    SetOwners,
}

/// A single typed mutation of one token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenUpdate {
    SetZOrder(i32),
    SetPosition { x: i32, y: i32 },
    SetName(String),
    SetGmName(Option<String>),
    SetVisible(bool),
    SetLayer(Layer),
    SetFacing(Option<i32>),
    SetProperty { name: String, value: String },
    RemoveProperty(String),
    SetOwners(BTreeSet<String>),
}

impl TokenUpdate {
    pub fn kind(&self) -> TokenUpdateKind {
        match self {
            Self::SetZOrder(_) => TokenUpdateKind::SetZOrder,
            Self::SetPosition { .. } => TokenUpdateKind::SetPosition,
            Self::SetName(_) => TokenUpdateKind::SetName,
            Self::SetGmName(_) => TokenUpdateKind::SetGmName,
            Self::SetVisible(_) => TokenUpdateKind::SetVisible,
            Self::SetLayer(_) => TokenUpdateKind::SetLayer,
            Self::SetFacing(_) => TokenUpdateKind::SetFacing,
            Self::SetProperty { .. } => TokenUpdateKind::SetProperty,
            Self::RemoveProperty(_) => TokenUpdateKind::RemoveProperty,
            Self::SetOwners(_) => TokenUpdateKind::SetOwners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_updates_fields() {
        let mut token = Token::new("Goblin");
        token.apply(TokenUpdate::SetZOrder(7));
        token.apply(TokenUpdate::SetPosition { x: 50, y: -20 });
        token.apply(TokenUpdate::SetProperty {
            name: "HP".into(),
            value: "12".into(),
        });
        assert_eq!(token.z_order, 7);
        assert_eq!((token.x, token.y), (50, -20));
        assert_eq!(token.properties.get("HP").map(String::as_str), Some("12"));

        token.apply(TokenUpdate::RemoveProperty("HP".into()));
        assert!(token.properties.is_empty());
    }

    #[test]
    fn unowned_token_is_owned_by_everyone() {
        let mut token = Token::new("Chest");
        assert!(token.is_owned_by("anyone"));
        token.apply(TokenUpdate::SetOwners(BTreeSet::from(["Ann".to_string()])));
        assert!(token.is_owned_by("Ann"));
        assert!(!token.is_owned_by("Bob"));
    }

    #[test]
    fn update_kind_matches_variant() {
        assert_eq!(
            TokenUpdate::SetFacing(Some(90)).kind(),
            TokenUpdateKind::SetFacing
        );
        assert_eq!(
            TokenUpdate::SetPosition { x: 0, y: 0 }.kind(),
            TokenUpdateKind::SetPosition
        );
    }
}

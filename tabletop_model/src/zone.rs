// Zones: the unit of sharing.
//
// A `Zone` owns its tokens, drawings, labels, initiative list, fog state and
// topology. The server holds the canonical copy; clients hold mirrors.
//
// Z-order operations (`next_z_order`, `bring_to_front`, `send_to_back`) are
// pure read-modify-write helpers over the token map. They keep the selected
// tokens in their existing relative order and hand back the updated tokens
// so the caller can broadcast them. The caller is responsible for holding
// whatever lock makes the read and the write one atomic step.
//
// Fog of war is tracked as a global exposed `Area` plus an optional
// per-token exposed area (`ExposedAreaMeta`) used when the server policy
// gives each player an individual view. Operations that name a non-empty
// token set update the per-token areas; an empty set updates the global one.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::drawing::{Drawable, DrawnElement, Pen};
use crate::geom::Area;
use crate::initiative::InitiativeList;
use crate::label::Label;
use crate::token::{Token, TokenUpdate};
use crate::types::{AssetId, Guid, Layer, TopologyType, VisionType};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    /// Cell edge length in zone pixels. Zero disables snapping.
    pub size: u32,
    pub offset_x: i32,
    pub offset_y: i32,
    /// Packed 0xAARRGGBB colour.
    pub color: u32,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            size: 50,
            offset_x: 0,
            offset_y: 0,
            color: 0xFF00_0000,
        }
    }
}

impl Grid {
    /// Snap a zone point to the top-left corner of its grid cell.
    pub fn snap(&self, x: i32, y: i32) -> (i32, i32) {
        if self.size == 0 {
            return (x, y);
        }
        let size = i32::try_from(self.size).unwrap_or(i32::MAX);
        let snap_axis = |v: i32, offset: i32| (v - offset).div_euclid(size) * size + offset;
        (snap_axis(x, self.offset_x), snap_axis(y, self.offset_y))
    }
}

/// Background image of a zone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub asset: Option<AssetId>,
    pub x: i32,
    pub y: i32,
}

/// Area a single token has exposed under individual fog of war.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedAreaMeta {
    pub exposed: Area,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: Guid,
    pub name: String,
    pub player_alias: Option<String>,
    pub visible: bool,
    pub has_fog: bool,
    pub vision_type: VisionType,
    pub grid: Grid,
    pub board: Board,
    pub initiative: InitiativeList,
    tokens: BTreeMap<Guid, Token>,
    drawables: Vec<DrawnElement>,
    labels: BTreeMap<Guid, Label>,
    exposed: Area,
    exposed_meta: BTreeMap<Guid, ExposedAreaMeta>,
    topology: BTreeMap<TopologyType, Area>,
}

impl Zone {
    pub fn new(name: impl Into<String>) -> Self {
        let id = Guid::new();
        Self {
            id,
            name: name.into(),
            player_alias: None,
            visible: true,
            has_fog: false,
            vision_type: VisionType::Off,
            grid: Grid::default(),
            board: Board::default(),
            initiative: InitiativeList::new(id),
            tokens: BTreeMap::new(),
            drawables: Vec::new(),
            labels: BTreeMap::new(),
            exposed: Area::new(),
            exposed_meta: BTreeMap::new(),
            topology: BTreeMap::new(),
        }
    }

    /// Name shown to players: the alias if one is set.
    pub fn display_name(&self) -> &str {
        self.player_alias.as_deref().unwrap_or(&self.name)
    }

    // -----------------------------------------------------------------------
    // Tokens
    // -----------------------------------------------------------------------

    pub fn token(&self, id: Guid) -> Option<&Token> {
        self.tokens.get(&id)
    }

    pub fn token_mut(&mut self, id: Guid) -> Option<&mut Token> {
        self.tokens.get_mut(&id)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Insert or replace a token. Returns the previous version, if any.
    pub fn put_token(&mut self, token: Token) -> Option<Token> {
        self.tokens.insert(token.id, token)
    }

    /// Remove a token along with its initiative entries and individual fog.
    pub fn remove_token(&mut self, id: Guid) -> Option<Token> {
        let removed = self.tokens.remove(&id)?;
        self.initiative.remove_token(id);
        self.exposed_meta.remove(&id);
        Some(removed)
    }

    /// Apply a typed update to one token. Returns false if the token is gone.
    pub fn update_token(&mut self, id: Guid, update: TokenUpdate) -> bool {
        match self.tokens.get_mut(&id) {
            Some(token) => {
                token.apply(update);
                true
            }
            None => false,
        }
    }

    pub fn largest_z_order(&self) -> Option<i32> {
        self.tokens.values().map(|t| t.z_order).max()
    }

    pub fn smallest_z_order(&self) -> Option<i32> {
        self.tokens.values().map(|t| t.z_order).min()
    }

    /// The z-order a newly introduced token receives: one above the current
    /// maximum, or 1 in an empty zone. `None` once the maximum is `i32::MAX`.
    pub fn next_z_order(&self) -> Option<i32> {
        match self.largest_z_order() {
            Some(z) => z.checked_add(1),
            None => Some(1),
        }
    }

    /// Claim a z-order for a newly introduced token. If the values above the
    /// maximum are exhausted the zone is compacted first; the tokens that
    /// compaction renumbered are returned alongside the claimed value.
    pub fn claim_next_z_order(&mut self) -> (i32, Vec<Token>) {
        if let Some(z) = self.next_z_order() {
            return (z, Vec::new());
        }
        let renumbered = self.compact_z_orders();
        (self.largest_z_order().unwrap_or(0) + 1, renumbered)
    }

    /// Tokens in paint order, ties broken by id.
    pub fn tokens_by_z_order(&self) -> Vec<&Token> {
        let mut tokens: Vec<&Token> = self.tokens.values().collect();
        tokens.sort_by_key(|t| (t.z_order, t.id));
        tokens
    }

    /// Renumber every token 1..=n in paint order. Returns the tokens whose
    /// z-order changed, lowest first.
    pub fn compact_z_orders(&mut self) -> Vec<Token> {
        let before = self.z_orders();
        let order: Vec<Guid> = self.tokens_by_z_order().iter().map(|t| t.id).collect();
        let mut z = 0;
        self.reassign(&order, || {
            z += 1;
            z
        });
        self.changed_since(&before)
    }

    /// Move the named tokens above every other token, keeping their relative
    /// order. Unknown ids are ignored. Returns every token whose z-order
    /// changed (including any the zone had to compact), lowest first.
    pub fn bring_to_front(&mut self, ids: &BTreeSet<Guid>) -> Vec<Token> {
        let before = self.z_orders();
        let selected = self.selected_by_z_order(ids);
        let count = len_as_z(&selected);
        if self.largest_z_order().unwrap_or(0).checked_add(count).is_none() {
            self.compact_z_orders();
        }
        let mut z = self.largest_z_order().unwrap_or(0);
        self.reassign(&selected, || {
            z += 1;
            z
        });
        self.changed_since(&before)
    }

    /// Move the named tokens below every other token, keeping their relative
    /// order. Unknown ids are ignored. Returns every token whose z-order
    /// changed (including any the zone had to compact), lowest first.
    pub fn send_to_back(&mut self, ids: &BTreeSet<Guid>) -> Vec<Token> {
        let before = self.z_orders();
        let selected = self.selected_by_z_order(ids);
        let count = len_as_z(&selected);
        if self.smallest_z_order().unwrap_or(0).checked_sub(count).is_none() {
            self.compact_z_orders();
        }
        let mut z = self.smallest_z_order().unwrap_or(0) - count;
        self.reassign(&selected, || {
            let assigned = z;
            z += 1;
            assigned
        });
        self.changed_since(&before)
    }

    fn selected_by_z_order(&self, ids: &BTreeSet<Guid>) -> Vec<Guid> {
        let mut selected: Vec<&Token> = ids.iter().filter_map(|id| self.tokens.get(id)).collect();
        selected.sort_by_key(|t| (t.z_order, t.id));
        selected.into_iter().map(|t| t.id).collect()
    }

    fn reassign(&mut self, ids: &[Guid], mut next: impl FnMut() -> i32) {
        for id in ids {
            if let Some(token) = self.tokens.get_mut(id) {
                token.z_order = next();
            }
        }
    }

    fn z_orders(&self) -> BTreeMap<Guid, i32> {
        self.tokens.iter().map(|(id, t)| (*id, t.z_order)).collect()
    }

    fn changed_since(&self, before: &BTreeMap<Guid, i32>) -> Vec<Token> {
        let mut changed: Vec<Token> = self
            .tokens
            .values()
            .filter(|t| before.get(&t.id) != Some(&t.z_order))
            .cloned()
            .collect();
        changed.sort_by_key(|t| (t.z_order, t.id));
        changed
    }

    // -----------------------------------------------------------------------
    // Drawings
    // -----------------------------------------------------------------------

    pub fn drawables(&self) -> &[DrawnElement] {
        &self.drawables
    }

    pub fn add_drawable(&mut self, element: DrawnElement) {
        self.drawables.push(element);
    }

    /// Replace the shape and pen of an existing drawing in place.
    pub fn update_drawable(&mut self, drawable: Drawable, pen: Pen) -> bool {
        match self.drawables.iter_mut().find(|e| e.id() == drawable.id) {
            Some(element) => {
                element.drawable = drawable;
                element.pen = pen;
                true
            }
            None => false,
        }
    }

    pub fn remove_drawable(&mut self, id: Guid) -> Option<DrawnElement> {
        let index = self.drawables.iter().position(|e| e.id() == id)?;
        Some(self.drawables.remove(index))
    }

    /// Remove every drawing on `layer`. Returns how many were removed.
    pub fn clear_drawables(&mut self, layer: Layer) -> usize {
        let before = self.drawables.len();
        self.drawables.retain(|e| e.drawable.layer != layer);
        before - self.drawables.len()
    }

    // -----------------------------------------------------------------------
    // Labels
    // -----------------------------------------------------------------------

    pub fn label(&self, id: Guid) -> Option<&Label> {
        self.labels.get(&id)
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.labels.values()
    }

    pub fn put_label(&mut self, label: Label) {
        self.labels.insert(label.id, label);
    }

    pub fn remove_label(&mut self, id: Guid) -> Option<Label> {
        self.labels.remove(&id)
    }

    // -----------------------------------------------------------------------
    // Fog of war
    // -----------------------------------------------------------------------

    pub fn exposed_area(&self) -> &Area {
        &self.exposed
    }

    pub fn exposed_meta(&self, token: Guid) -> Option<&ExposedAreaMeta> {
        self.exposed_meta.get(&token)
    }

    pub fn set_exposed_meta(&mut self, token: Guid, meta: ExposedAreaMeta) {
        self.exposed_meta.insert(token, meta);
    }

    pub fn expose(&mut self, area: &Area, tokens: &BTreeSet<Guid>) {
        if tokens.is_empty() {
            self.exposed.add(area);
        } else {
            for token in tokens {
                self.exposed_meta.entry(*token).or_default().exposed.add(area);
            }
        }
    }

    pub fn hide(&mut self, area: &Area, tokens: &BTreeSet<Guid>) {
        if tokens.is_empty() {
            self.exposed.subtract(area);
        } else {
            for token in tokens {
                if let Some(meta) = self.exposed_meta.get_mut(token) {
                    meta.exposed.subtract(area);
                }
            }
        }
    }

    /// Replace the exposed area outright.
    pub fn set_fog(&mut self, area: Area, tokens: &BTreeSet<Guid>) {
        if tokens.is_empty() {
            self.exposed = area;
        } else {
            for token in tokens {
                self.exposed_meta.insert(
                    *token,
                    ExposedAreaMeta {
                        exposed: area.clone(),
                    },
                );
            }
        }
    }

    /// Re-cover the zone. With `global_only` the per-token areas survive.
    pub fn clear_exposed(&mut self, global_only: bool) {
        self.exposed.clear();
        if !global_only {
            self.exposed_meta.clear();
        }
    }

    // -----------------------------------------------------------------------
    // Topology
    // -----------------------------------------------------------------------

    pub fn topology(&self, kind: TopologyType) -> Option<&Area> {
        self.topology.get(&kind)
    }

    pub fn add_topology(&mut self, kind: TopologyType, area: &Area) {
        self.topology.entry(kind).or_default().add(area);
    }

    pub fn remove_topology(&mut self, kind: TopologyType, area: &Area) {
        if let Some(existing) = self.topology.get_mut(&kind) {
            existing.subtract(area);
        }
    }
}

fn len_as_z(ids: &[Guid]) -> i32 {
    i32::try_from(ids.len()).unwrap_or(i32::MAX)
}

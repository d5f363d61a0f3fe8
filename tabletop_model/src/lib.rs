// tabletop_model — the replicated session document.
//
// Everything a tabletop session shares between the server and its clients:
// the campaign, its zones, the tokens/drawings/labels/initiative inside each
// zone, content-addressed assets, add-on libraries, and the namespaced game
// data store. The server holds the authoritative copy; every client holds a
// mirror that the command stream keeps eventually consistent.
//
// Module overview:
// - `types.rs`:      Identifier newtypes (`Guid`, `AssetId`) and small enums
//                    shared across the model (`Layer`, `Role`, `VisionType`,
//                    `TopologyType`).
// - `geom.rs`:       `ZonePoint`, `Rect`, and `Area` (a coarse rectangle set
//                    used for fog and topology bookkeeping).
// - `token.rs`:      `Token` and the typed `TokenUpdate` mutations.
// - `drawing.rs`:    Pens, drawables and drawn elements.
// - `label.rs`:      Free-floating text labels.
// - `initiative.rs`: Per-zone initiative order with index reconciliation.
// - `zone.rs`:       `Zone`, the unit of sharing, and its `Grid`.
// - `campaign.rs`:   `Campaign` (the set of zones plus campaign-wide
//                    properties and macro buttons).
// - `session.rs`:    Session-level values that are not part of a zone:
//                    players, pointers, chat messages, server policy.
// - `asset.rs`:      `Asset` blobs and the thread-safe `AssetStore`.
// - `library.rs`:    Add-on library registry.
// - `data_store.rs`: Namespaced JSON game-data store.
// - `error.rs`:      `ModelError`.
//
// Design decisions:
// - **Plain owned data.** The model has no locking of its own except in the
//   stores that the client's background path touches (`AssetStore`,
//   `LibraryRegistry`, `DataStore`). Zone and campaign state is only ever
//   mutated by a single owner: the server authority under its lock, or the
//   client's model worker.
// - **Missing entities are not errors.** Mutators that name an absent token,
//   drawable or label return `false`/`None` and leave the zone untouched.
//   Racing tear-downs between peers are expected.
// - **Deterministic ordering.** `BTreeMap` everywhere so that iteration order
//   (and therefore serialized output) is stable across peers.

pub mod asset;
pub mod campaign;
pub mod data_store;
pub mod drawing;
pub mod error;
pub mod geom;
pub mod initiative;
pub mod label;
pub mod library;
pub mod session;
pub mod token;
pub mod types;
pub mod zone;

pub use asset::{Asset, AssetStore};
pub use campaign::{Campaign, CampaignProperties, MacroButton};
pub use data_store::{DataStore, DataStoreSnapshot, DataValue, NamespaceData};
pub use drawing::{DrawnElement, Drawable, Pen, Shape};
pub use error::ModelError;
pub use geom::{Area, Rect, ZonePoint};
pub use initiative::{InitiativeList, TokenInitiative};
pub use label::Label;
pub use library::{AddOnLibrary, LibraryRegistry};
pub use session::{
    MessageChannel, MovementMetric, Player, Pointer, PointerKind, ServerPolicy, TextMessage,
};
pub use token::{Token, TokenUpdate, TokenUpdateKind};
pub use types::{AssetId, Guid, Layer, Role, TopologyType, VisionType};
pub use zone::{Board, ExposedAreaMeta, Grid, Zone};

// Routes every received command to the right execution context.
//
// `Dispatcher::handle` runs on the receive thread and never blocks on the
// model:
// - Background-safe kinds (asset transfer, add-on libraries, the game data
//   store, heartbeat) are applied right here. They only touch stores with
//   their own locks (`AssetStore`, `TransferManager`, `LibraryRegistry`,
//   `DataStore`) and never the `ClientModel`.
// - Everything else is queued on the model worker in receipt order.
//
// Optimistic kinds are skipped when they carry this client's own connection
// id: the command API already applied them locally when they were sent.

use std::sync::Arc;

use tabletop_model::{
    AddOnLibrary, Asset, AssetId, AssetStore, DataStore, DataStoreSnapshot, DataValue,
    LibraryRegistry, NamespaceData,
};
use tabletop_protocol::{
    Arg, AssetChunk, AssetHeader, Command, CommandKind, ConnectionId, ProtocolError,
};
use tracing::{debug, warn};

use crate::net::CommandSink;
use crate::transfer::TransferManager;
use crate::ui::UiHooks;
use crate::worker::ModelQueue;

/// The thread-safe stores the background path writes to.
pub struct Stores {
    pub assets: Arc<AssetStore>,
    pub libraries: Arc<LibraryRegistry>,
    pub data: Arc<DataStore>,
}

impl Default for Stores {
    fn default() -> Self {
        Self {
            assets: Arc::new(AssetStore::new()),
            libraries: Arc::new(LibraryRegistry::new()),
            data: Arc::new(DataStore::new()),
        }
    }
}

pub struct Dispatcher {
    me: ConnectionId,
    stores: Stores,
    transfers: TransferManager,
    model: ModelQueue,
    ui: Arc<dyn UiHooks>,
    sink: Arc<dyn CommandSink>,
}

impl Dispatcher {
    pub fn new(
        me: ConnectionId,
        stores: Stores,
        model: ModelQueue,
        ui: Arc<dyn UiHooks>,
        sink: Arc<dyn CommandSink>,
    ) -> Self {
        let transfers = TransferManager::new(Arc::clone(&stores.assets));
        Self {
            me,
            stores,
            transfers,
            model,
            ui,
            sink,
        }
    }

    pub fn handle(&self, command: Command) {
        let kind = command.kind();
        debug!("from {} got {kind}", command.sender());
        if kind.is_optimistic() && *command.sender() == self.me {
            debug!("skipping echo of own {kind}");
            return;
        }
        if kind.is_background_safe() {
            if let Err(e) = self.background(&command) {
                warn!("{kind} from {} not applied: {e}", command.sender());
            }
        } else {
            self.model.submit(command);
        }
    }

    fn background(&self, cmd: &Command) -> Result<(), ProtocolError> {
        match cmd.kind() {
            CommandKind::PutAsset => {
                let asset: &Asset = cmd.get(0)?;
                self.put_asset(asset.clone());
            }
            CommandKind::RemoveAsset => {
                // Assets are content-addressed and may be shared; keep them.
                let id: &AssetId = cmd.get(0)?;
                debug!("ignoring removal of asset {id}");
            }
            CommandKind::StartAssetTransfer => {
                let header: &AssetHeader = cmd.get(0)?;
                if let Some(asset) = self.transfers.start(header.clone()) {
                    self.asset_arrived(&asset.id);
                }
            }
            CommandKind::UpdateAssetTransfer => {
                let chunk: &AssetChunk = cmd.get(0)?;
                if let Some(asset) = self.transfers.receive(chunk) {
                    self.asset_arrived(&asset.id);
                }
            }
            CommandKind::AddAddOnLibrary => {
                let libraries: &[AddOnLibrary] = cmd.get(0)?;
                for library in libraries {
                    self.add_library(library.clone());
                }
            }
            CommandKind::RemoveAddOnLibrary => {
                let namespaces: &[String] = cmd.get(0)?;
                for namespace in namespaces {
                    self.stores.libraries.remove(namespace);
                }
            }
            CommandKind::RemoveAllAddOnLibraries => self.stores.libraries.clear(),
            CommandKind::UpdateDataStore => {
                let bytes: &[u8] = cmd.get(0)?;
                let snapshot: DataStoreSnapshot = serde_json::from_slice(bytes)?;
                self.stores.data.replace_all(snapshot);
            }
            CommandKind::UpdateDataNamespace => {
                let bytes: &[u8] = cmd.get(0)?;
                let namespace: NamespaceData = serde_json::from_slice(bytes)?;
                self.stores.data.replace_namespace(namespace);
            }
            CommandKind::UpdateData => {
                let data_type: &str = cmd.get(0)?;
                let namespace: &str = cmd.get(1)?;
                let bytes: &[u8] = cmd.get(2)?;
                let value: DataValue = serde_json::from_slice(bytes)?;
                self.stores.data.set(data_type, namespace, value);
            }
            CommandKind::RemoveDataStore => self.stores.data.clear(),
            CommandKind::RemoveDataNamespace => {
                let data_type: &str = cmd.get(0)?;
                let namespace: &str = cmd.get(1)?;
                self.stores.data.remove_namespace(data_type, namespace);
            }
            CommandKind::RemoveData => {
                let data_type: &str = cmd.get(0)?;
                let namespace: &str = cmd.get(1)?;
                let name: &str = cmd.get(2)?;
                self.stores.data.remove(data_type, namespace, name);
            }
            CommandKind::Heartbeat => {}
            other => debug!("{other} is not handled in the background"),
        }
        Ok(())
    }

    fn put_asset(&self, asset: Asset) {
        if asset.is_placeholder() {
            warn!("server does not have asset {}", asset.id);
        } else if !asset.verify() {
            warn!("asset {} failed verification, dropped", asset.id);
            return;
        }
        let id = self.stores.assets.put(asset).id.clone();
        self.asset_arrived(&id);
    }

    fn asset_arrived(&self, id: &AssetId) {
        for namespace in self.stores.libraries.mark_loaded(id) {
            debug!("add-on library {namespace} loaded");
        }
        self.ui.asset_available(id);
        self.ui.refresh();
    }

    /// Register a library, fetching its asset if it is not here yet.
    fn add_library(&self, library: AddOnLibrary) {
        let asset_id = library.asset_id.clone();
        let loaded = self.stores.assets.contains(&asset_id);
        self.stores.libraries.register(library, loaded);
        if loaded {
            return;
        }
        let request = Command::new(CommandKind::GetAsset, vec![Arg::AssetId(asset_id)]);
        if let Err(e) = request
            .map_err(Into::into)
            .and_then(|cmd| self.sink.send(&cmd))
        {
            warn!("could not request library asset: {e}");
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn transfers(&self) -> &TransferManager {
        &self.transfers
    }
}

// A connected tabletop client: transport, dispatcher, model worker and
// command API wired together.
//
// `TableClient::connect` performs the handshake, builds the model mirror
// from the `Welcome`, starts the model worker and the receive thread, and
// returns a handle exposing the command API and read access to the model.
// The server sends the campaign right after the handshake; it arrives like
// any other command.

use std::net::ToSocketAddrs;
use std::sync::Arc;

use tabletop_model::Player;
use tabletop_protocol::ConnectionId;
use tracing::info;

use crate::coalesce::CoalescingQueue;
use crate::commands::ServerCommands;
use crate::config::ClientConfig;
use crate::dispatcher::{Dispatcher, Stores};
use crate::error::ClientError;
use crate::model::{ClientModel, SharedModel};
use crate::net::{CommandSink, NetClient, WelcomeInfo};
use crate::ui::UiHooks;
use crate::worker::{self, ModelQueue};

pub struct TableClient {
    welcome: WelcomeInfo,
    commands: ServerCommands,
    model: SharedModel,
    queue: ModelQueue,
    dispatcher: Arc<Dispatcher>,
    sink: Arc<dyn CommandSink>,
}

impl TableClient {
    pub fn connect(
        addr: impl ToSocketAddrs,
        config: &ClientConfig,
        ui: Arc<dyn UiHooks>,
    ) -> Result<Self, ClientError> {
        let (mut net, welcome) = NetClient::connect(addr, config)?;
        let sink: Arc<dyn CommandSink> = net.sink();
        let me = welcome.connection_id.clone();

        let model = SharedModel::new(ClientModel::new(
            Player::new(config.player_name.as_str(), config.role),
            me.clone(),
            welcome.players.clone(),
        ));
        let (queue, _worker) = worker::spawn(model.clone(), Arc::clone(&ui), Arc::clone(&sink));

        let dispatcher = Arc::new(Dispatcher::new(
            me.clone(),
            Stores::default(),
            queue.clone(),
            Arc::clone(&ui),
            Arc::clone(&sink),
        ));
        let receiving = Arc::clone(&dispatcher);
        let closed_ui = Arc::clone(&ui);
        net.spawn_reader(
            move |command| receiving.handle(command),
            move || {
                info!("disconnected from server");
                closed_ui.disconnected("connection closed");
            },
        );

        let drag = CoalescingQueue::new(Arc::clone(&sink), config.coalesce_interval());
        let commands = ServerCommands::new(
            me,
            config.player_name.as_str(),
            Arc::clone(&sink),
            queue.clone(),
            drag,
        );
        Ok(Self {
            welcome,
            commands,
            model,
            queue,
            dispatcher,
            sink,
        })
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.welcome.connection_id
    }

    pub fn session_name(&self) -> &str {
        &self.welcome.session_name
    }

    pub fn commands(&self) -> &ServerCommands {
        &self.commands
    }

    pub fn model(&self) -> &SharedModel {
        &self.model
    }

    pub fn stores(&self) -> &Stores {
        self.dispatcher.stores()
    }

    /// Wait until every command received or sent so far has been applied
    /// to the model.
    pub fn sync(&self) -> bool {
        self.queue.sync()
    }

    /// Say goodbye and close the connection.
    pub fn disconnect(&self) {
        self.sink.close();
    }
}

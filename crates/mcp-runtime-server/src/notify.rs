//! Subscription and notification fan-out (spec §4.4).

use mcp_runtime_protocol::jsonrpc::JsonRpcNotification;
use mcp_runtime_protocol::jsonrpc::JsonRpcMessage;
use mcp_runtime_session::{Session, SubscriptionIndex};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Push a `notifications/resources/updated` to every session subscribed to
/// `uri`. Sessions without an attached channel still have the notification
/// recorded to their event log (via [`Session::reply`]'s push/pull
/// hybrid) so a later resume replays it.
pub async fn notify_resource_updated(
    subscriptions: &SubscriptionIndex,
    sessions: &HashMap<mcp_runtime_session::SessionId, Arc<Session>>,
    uri: &str,
) {
    for session_id in subscriptions.subscribers(uri) {
        if let Some(session) = sessions.get(&session_id) {
            let note = JsonRpcNotification::new(
                "notifications/resources/updated",
                Some(json!({"uri": uri})),
            );
            if let Err(e) = session.reply(JsonRpcMessage::Notification(note), None).await {
                tracing::warn!(session = %session_id, error = %e, "failed to record resources/updated");
            }
        }
    }
}

/// Broadcast a `notifications/{tools,prompts,resources}/list_changed` to
/// every session in `sessions`. Catalog changes are server-wide, unlike
/// resource updates which are scoped to subscribers of one URI.
pub async fn notify_list_changed(
    sessions: &HashMap<mcp_runtime_session::SessionId, Arc<Session>>,
    list: ListKind,
) {
    let method = list.method();
    for session in sessions.values() {
        let note = JsonRpcNotification::new(method, None);
        if let Err(e) = session.reply(JsonRpcMessage::Notification(note), None).await {
            tracing::warn!(session = %session.id(), error = %e, "failed to record list_changed");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Tools,
    Prompts,
    Resources,
}

impl ListKind {
    fn method(self) -> &'static str {
        match self {
            Self::Tools => "notifications/tools/list_changed",
            Self::Prompts => "notifications/prompts/list_changed",
            Self::Resources => "notifications/resources/list_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_runtime_protocol::ProtocolVersion;
    use mcp_runtime_session::{
        Capabilities, ChannelId, ImplementationInfo, MemorySessionStore, SessionData, SessionId,
        SessionStore,
    };
    use std::sync::Mutex as StdMutex;

    struct RecordingChannel {
        received: StdMutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl mcp_runtime_session::Channel for RecordingChannel {
        async fn push(
            &self,
            event: &mcp_runtime_session::Event,
        ) -> std::result::Result<(), mcp_runtime_session::ChannelClosed> {
            self.received.lock().unwrap().push(format!("{:?}", event.kind));
            Ok(())
        }
    }

    async fn new_session() -> Session {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let data = SessionData::new(
            ProtocolVersion::latest(),
            ImplementationInfo::default(),
            Capabilities::default(),
            ImplementationInfo::default(),
            Capabilities::default(),
        );
        Session::initialize(SessionId::generate(), store, data)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn notify_resource_updated_reaches_subscribed_session() {
        let subs = SubscriptionIndex::new();
        let session = new_session().await;
        let channel = Arc::new(RecordingChannel {
            received: StdMutex::new(Vec::new()),
        });
        session
            .attach_channel(ChannelId("c1".into()), channel.clone())
            .await
            .unwrap();

        subs.subscribe("file:///a.txt", session.id().clone());
        let mut sessions = HashMap::new();
        sessions.insert(session.id().clone(), Arc::new(session));

        notify_resource_updated(&subs, &sessions, "file:///a.txt").await;
        assert!(channel.received.lock().unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn notify_list_changed_reaches_every_session() {
        let session = new_session().await;
        let channel = Arc::new(RecordingChannel {
            received: StdMutex::new(Vec::new()),
        });
        session
            .attach_channel(ChannelId("c1".into()), channel.clone())
            .await
            .unwrap();
        let mut sessions = HashMap::new();
        sessions.insert(session.id().clone(), Arc::new(session));

        notify_list_changed(&sessions, ListKind::Tools).await;
        assert!(channel.received.lock().unwrap().len() >= 2);
    }
}

//! Subscription manager.
//!
//! Builds the subscriber set from the requested stream names and the
//! server's advertised inventory, attaches webhooks, and runs all
//! subscribers until they finish or a termination signal arrives. The
//! set is assembled single-threaded before anything is spawned and is
//! read-only afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use yanghook_core::{Error, Result, Stream, StreamList, Webhook, fuzzy_name_match};

use crate::classify::HandlerRegistry;
use crate::client::RestconfClient;
use crate::subscriber::Subscriber;

/// Validate webhooks and attach them to the streams they reference.
///
/// A webhook that fails validation (bad target URL, bad filter pattern)
/// is disabled and left unattached; it is excluded from every later fire
/// decision. A webhook referencing no advertised stream logs a warning.
/// Returns the validated hooks for reporting.
pub fn attach_webhooks(list: &mut StreamList, hooks: Vec<Webhook>) -> Vec<Arc<Webhook>> {
    let mut attached = Vec::with_capacity(hooks.len());
    for mut hook in hooks {
        if !hook.disable
            && let Err(e) = hook.validate()
        {
            error!(stream = %hook.stream, url = %hook.url, error = %e, "webhook disabled");
            hook.disable = true;
        }
        let hook = Arc::new(hook);
        if !hook.disable {
            let streams = list.find_by_name_mut(&hook.stream);
            if streams.is_empty() {
                warn!(
                    stream = %hook.stream,
                    "webhook references no stream advertised by the server"
                );
            }
            for stream in streams {
                debug!(stream = %stream.name, url = %hook.url, "webhook attached");
                stream.add_webhook(Arc::clone(&hook));
            }
        }
        attached.push(hook);
    }
    attached
}

/// The set of stream subscribers for one run of the process.
#[derive(Debug)]
pub struct SubscriberSet {
    subscribers: Vec<Subscriber>,
    cancel: broadcast::Sender<()>,
}

impl SubscriberSet {
    /// Build one subscriber per (requested stream × XML access entry).
    ///
    /// An empty request list means every advertised stream. Requested
    /// names match fuzzily; a name that matches no advertised stream
    /// with an XML access entry makes the whole build fail.
    pub fn build(
        requested: &[String],
        list: StreamList,
        registry: &HandlerRegistry,
    ) -> Result<Self> {
        // An explicit request that matches nothing is fatal; a stream we
        // picked up ourselves is merely skipped when it has no XML access.
        let explicit = !requested.is_empty();
        let requested: Vec<String> = if explicit {
            requested.to_vec()
        } else {
            list.names()
        };

        let shared: Vec<Arc<Stream>> = list.streams.into_iter().map(Arc::new).collect();

        let mut found: BTreeMap<&str, bool> = BTreeMap::new();
        let mut subscribers = Vec::new();
        for request in &requested {
            found.entry(request).or_insert(false);
            for stream in &shared {
                if !fuzzy_name_match(request, &stream.name) {
                    continue;
                }
                for access in stream.xml_access() {
                    found.insert(request, true);
                    subscribers.push(Subscriber {
                        stream: Arc::clone(stream),
                        access: access.location.clone(),
                        handler: registry.handler_for(&stream.name),
                    });
                }
            }
        }

        let missing: Vec<String> = found
            .iter()
            .filter(|(_, ok)| !**ok)
            .map(|(name, _)| name.to_string())
            .collect();
        if explicit && !missing.is_empty() {
            for name in &missing {
                error!(stream = %name, "requested stream not found");
            }
            return Err(Error::StreamsNotFound { names: missing });
        }

        let (cancel, _) = broadcast::channel(1);
        Ok(Self {
            subscribers,
            cancel,
        })
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Handle for triggering shutdown from outside (tests, embedding).
    pub fn cancel_handle(&self) -> broadcast::Sender<()> {
        self.cancel.clone()
    }

    /// Start every subscriber, wire up the termination signal, and wait
    /// for all of them to report. In-flight notification and webhook
    /// tasks are deliberately not joined.
    pub async fn run(self, client: &RestconfClient) {
        let mut tasks = JoinSet::new();
        for subscriber in self.subscribers {
            let cancel = self.cancel.subscribe();
            let client = client.clone();
            tasks.spawn(async move {
                let name = subscriber.stream.name.clone();
                let (events, result) = subscriber.run(client, cancel).await;
                match result {
                    Ok(()) => info!(stream = %name, events, "subscriber exiting"),
                    Err(e) => warn!(stream = %name, events, error = %e, "subscriber exiting"),
                }
            });
        }

        let cancel = self.cancel.clone();
        let signals = tokio::spawn(async move {
            shutdown_signal().await;
            info!("shutdown signal received, cancelling subscribers");
            let _ = cancel.send(());
        });

        while tasks.join_next().await.is_some() {}
        signals.abort();
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "cannot install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

use docflow::notify::{DeliveryLog, InMemoryNotifier, InMemoryTaskSink};
use docflow::registry::sequence::SequenceGenerator;
use docflow::registry::service::DocumentRegistry;
use docflow::registry::store::{MemoryCustomerDirectory, MemoryStore};
use docflow::signature::SignatureService;
use docflow::template::TemplateStore;
use docflow::versioning::VersionHistoryStore;
use docflow::workflow::{ApprovalTrail, FlowRegistry};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MemoryRegistry =
    DocumentRegistry<MemoryStore, InMemoryNotifier, InMemoryTaskSink>;

/// Everything the server wires together, kept around so the scheduler can
/// share the store and the delivery log with the HTTP surface.
pub(crate) struct Wiring {
    pub(crate) registry: Arc<MemoryRegistry>,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) notifier: Arc<InMemoryNotifier>,
    pub(crate) deliveries: Arc<DeliveryLog>,
}

pub(crate) fn build_registry() -> Wiring {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(InMemoryNotifier::new());
    let deliveries = Arc::new(DeliveryLog::new());
    let versions = Arc::new(VersionHistoryStore::new());
    let registry = Arc::new(DocumentRegistry::new(
        Arc::clone(&store),
        Arc::new(SequenceGenerator::new()),
        Arc::new(SignatureService::new(Arc::clone(&versions))),
        versions,
        Arc::new(ApprovalTrail::new()),
        Arc::new(FlowRegistry::new()),
        Arc::clone(&notifier),
        Arc::new(InMemoryTaskSink::new()),
        Arc::clone(&deliveries),
        Arc::new(MemoryCustomerDirectory::new()),
        Arc::new(TemplateStore::new()),
    ));

    Wiring {
        registry,
        store,
        notifier,
        deliveries,
    }
}

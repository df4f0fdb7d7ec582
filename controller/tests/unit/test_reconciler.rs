//! Reconciler unit tests

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{created, load_balancer, pod, running, Harness, MockInventory, MockProbe, MockReleases};
use vllm_controller::identity::DeploymentIdentity;
use vllm_controller::inventory::{ExecTarget, LogTarget, PodPhase, ProbeOutcome};
use vllm_controller::reconcile::{
    DeploymentStatus, Lifecycle, LlmReadiness, PodRollup, Reconciler, UiStatus,
};
use vllm_controller::registry::DeploymentRegistry;

const MODEL_POD: &str = "demo-deployment-vllm-7d9f-0";
const ROUTER_POD: &str = "demo-deployment-router-5c4b-x";

fn demo() -> DeploymentIdentity {
    DeploymentIdentity::resolve("ns1", "demo").unwrap()
}

fn harness(inventory: Arc<MockInventory>, probe: Arc<MockProbe>) -> Harness {
    Harness::new(inventory, probe, MockReleases::new(vec![]))
}

fn assert_ui_consistent(status: &DeploymentStatus) {
    assert_eq!(
        status.ui_status() == UiStatus::Active,
        status.llm_readiness() == LlmReadiness::Ready
    );
    assert_eq!(
        status.ui_status() == UiStatus::Failed,
        status.llm_readiness() == LlmReadiness::Failed
    );
}

#[tokio::test]
async fn test_all_green_skips_probe() {
    let h = harness(
        MockInventory::new(vec![running(MODEL_POD), running(ROUTER_POD)]),
        MockProbe::unreachable(),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.pod_rollup, PodRollup::Running);
    assert_eq!(status.llm_readiness(), LlmReadiness::Ready);
    assert_eq!(status.ui_status(), UiStatus::Active);
    assert_eq!(status.detail, "Ready");
    assert_eq!(h.probe.calls(), 0);
    assert!(h.inventory.log_targets().is_empty());
    assert_eq!(status.pods.len(), 2);
}

#[tokio::test]
async fn test_fast_path_wins_over_probe() {
    // the probe would say "loading", but every pod is running and ready
    let h = harness(
        MockInventory::new(vec![running(MODEL_POD), running(ROUTER_POD)]),
        MockProbe::listing(&[]),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.llm_readiness(), LlmReadiness::Ready);
    assert_eq!(h.probe.calls(), 0);
    assert!(status.available_models.is_empty());
}

#[tokio::test]
async fn test_router_down() {
    let h = harness(
        MockInventory::new(vec![
            running(MODEL_POD),
            pod(ROUTER_POD, PodPhase::Pending, false),
        ]),
        MockProbe::listing(&["facebook/opt-125m"]),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.pod_rollup, PodRollup::ModelReadyRouterPending);
    assert_eq!(status.llm_readiness(), LlmReadiness::Starting);
    assert_eq!(status.ui_status(), UiStatus::Pending);
    assert_eq!(status.error, None);
    assert_eq!(h.probe.calls(), 0);
}

#[tokio::test]
async fn test_model_pending_router_ready() {
    let h = harness(
        MockInventory::new(vec![
            pod(MODEL_POD, PodPhase::Pending, false),
            running(ROUTER_POD),
        ]),
        MockProbe::unreachable(),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.pod_rollup, PodRollup::RouterReadyModelPending);
    assert_eq!(status.llm_readiness(), LlmReadiness::Starting);
}

#[tokio::test]
async fn test_probe_empty_models_is_loading() {
    let h = harness(
        MockInventory::new(vec![
            pod(MODEL_POD, PodPhase::Running, false),
            running(ROUTER_POD),
        ]),
        MockProbe::listing(&[]),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.pod_rollup, PodRollup::Running);
    assert_eq!(status.llm_readiness(), LlmReadiness::LoadingModel);
    assert_eq!(status.ui_status(), UiStatus::Pending);
    assert_eq!(status.detail, "Loading Model");
    assert_eq!(h.probe.calls(), 1);

    let requests = h.probe.requests.lock().unwrap().clone();
    assert_eq!(requests[0].namespace, "ns1");
    assert_eq!(requests[0].release_name, "demo");
    assert_eq!(requests[0].target, ExecTarget::Pod(ROUTER_POD.to_string()));
}

#[tokio::test]
async fn test_probe_lists_models() {
    let h = harness(
        MockInventory::new(vec![
            pod(MODEL_POD, PodPhase::Running, false),
            running(ROUTER_POD),
        ]),
        MockProbe::listing(&["facebook/opt-125m", "meta-llama/Llama-3.1-8B"]),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.llm_readiness(), LlmReadiness::Ready);
    assert_eq!(status.ui_status(), UiStatus::Active);
    assert_eq!(
        status.available_models,
        vec!["facebook/opt-125m", "meta-llama/Llama-3.1-8B"]
    );
    assert!(h.inventory.log_targets().is_empty());
}

#[tokio::test]
async fn test_probe_unparseable_is_api_error() {
    let h = harness(
        MockInventory::new(vec![
            pod(MODEL_POD, PodPhase::Running, false),
            running(ROUTER_POD),
        ]),
        MockProbe::new(ProbeOutcome::Unparseable),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.llm_readiness(), LlmReadiness::ApiError);
    assert_eq!(status.ui_status(), UiStatus::Pending);
    assert_eq!(status.detail, "API Error");
}

#[tokio::test]
async fn test_no_pods_at_all() {
    let h = harness(MockInventory::new(vec![]), MockProbe::unreachable());

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.pod_rollup, PodRollup::NoPodsFound);
    assert_eq!(status.llm_readiness(), LlmReadiness::Starting);
    assert_eq!(status.ui_status(), UiStatus::Pending);
    assert!(status.pods.is_empty());
    assert_eq!(status.created_at, None);
    assert_eq!(h.probe.calls(), 0);
}

#[tokio::test]
async fn test_load_balancer_hostname() {
    let inventory = MockInventory::new(vec![running(MODEL_POD), running(ROUTER_POD)]);
    inventory.set_service(load_balancer("demo-router-service", "x.example.com"));
    let h = harness(inventory, MockProbe::unreachable());

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.external_address.as_deref(), Some("x.example.com"));
    assert_eq!(status.public_url.as_deref(), Some("http://x.example.com"));
    assert_eq!(
        status.service_url,
        "demo-router-service.ns1.svc.cluster.local"
    );
}

#[tokio::test]
async fn test_pod_listing_failure_degrades() {
    let h = harness(
        MockInventory::failing("kubectl get pods failed in namespace ns1: Unable to connect to the server"),
        MockProbe::unreachable(),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.pod_rollup, PodRollup::NoPodsFound);
    assert_eq!(status.llm_readiness(), LlmReadiness::Failed);
    assert_eq!(status.ui_status(), UiStatus::Failed);
    assert!(status
        .error
        .as_deref()
        .unwrap()
        .contains("kubectl get pods failed"));
    assert_eq!(h.probe.calls(), 0);
    // the record is still written
    assert!(h.registry.get(&demo().id).is_some());
}

#[tokio::test]
async fn test_waiting_reason_with_error_fails() {
    let h = harness(
        MockInventory::new(vec![
            pod(MODEL_POD, PodPhase::Pending, false).with_waiting_reason("CreateContainerConfigError"),
            running(ROUTER_POD),
        ]),
        MockProbe::unreachable(),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.pod_rollup, PodRollup::RouterReadyModelPending);
    assert_eq!(status.llm_readiness(), LlmReadiness::Failed);
    assert_eq!(status.error.as_deref(), Some("CreateContainerConfigError"));
}

#[tokio::test]
async fn test_benign_waiting_reason_keeps_starting() {
    let h = harness(
        MockInventory::new(vec![
            pod(MODEL_POD, PodPhase::Pending, false).with_waiting_reason("ContainerCreating"),
            running(ROUTER_POD),
        ]),
        MockProbe::unreachable(),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.llm_readiness(), LlmReadiness::Starting);
    assert_eq!(status.error, None);
}

#[tokio::test]
async fn test_log_fallback_model_loaded() {
    let inventory = MockInventory::new(vec![
        pod(MODEL_POD, PodPhase::Running, false),
        running(ROUTER_POD),
    ]);
    inventory.set_logs("INFO Loading model weights\nINFO Model loaded successfully\n");
    let h = harness(inventory, MockProbe::unreachable());

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(h.probe.calls(), 1);
    assert_eq!(status.llm_readiness(), LlmReadiness::Starting);
    assert_eq!(status.detail, "Model Loaded, Service Starting");
    assert_eq!(
        h.inventory.log_targets(),
        vec![LogTarget::Pod(MODEL_POD.to_string())]
    );
    assert_eq!(*h.inventory.log_tails.lock().unwrap(), vec![50]);
}

#[tokio::test]
async fn test_log_fallback_downloading() {
    let inventory = MockInventory::new(vec![
        pod(MODEL_POD, PodPhase::Running, false),
        running(ROUTER_POD),
    ]);
    inventory.set_logs("Downloading shards: 3/7");
    let h = harness(inventory, MockProbe::unreachable());

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.llm_readiness(), LlmReadiness::LoadingModel);
    assert_eq!(status.detail, "Downloading/Loading Model");
}

#[tokio::test]
async fn test_log_fallback_failure_stays_initializing() {
    let h = harness(
        MockInventory::new(vec![
            pod(MODEL_POD, PodPhase::Running, false),
            running(ROUTER_POD),
        ]),
        MockProbe::unreachable(),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.llm_readiness(), LlmReadiness::Initializing);
    assert_eq!(status.ui_status(), UiStatus::Pending);
    assert_eq!(h.inventory.log_targets().len(), 1);
}

#[tokio::test]
async fn test_log_tail_is_configurable() {
    let inventory = MockInventory::new(vec![
        pod(MODEL_POD, PodPhase::Running, false),
        running(ROUTER_POD),
    ]);
    inventory.set_logs("nothing interesting");
    let probe = MockProbe::unreachable();
    let reconciler = Reconciler::new(
        inventory.clone(),
        probe,
        Arc::new(DeploymentRegistry::new()),
    )
    .with_log_tail_lines(20);

    let status = reconciler.refresh(&demo()).await;

    assert_eq!(status.llm_readiness(), LlmReadiness::Starting);
    assert_eq!(*inventory.log_tails.lock().unwrap(), vec![20]);
}

#[tokio::test]
async fn test_release_name_is_a_substring_match() {
    // release "demo" also claims the pods of "demo-v2"
    let h = harness(
        MockInventory::new(vec![
            running(MODEL_POD),
            running(ROUTER_POD),
            pod("demo-v2-deployment-vllm-0", PodPhase::Pending, false),
            running("postgres-0"),
        ]),
        MockProbe::unreachable(),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.pods.len(), 3);
    assert!(status.pods.iter().all(|p| p.name.contains("demo")));
    assert_eq!(status.pod_rollup, PodRollup::RouterReadyModelPending);
    assert_eq!(status.llm_readiness(), LlmReadiness::Starting);
}

#[tokio::test]
async fn test_unclassified_pods_roll_up_to_pending() {
    let h = harness(
        MockInventory::new(vec![pod("demo-worker-0", PodPhase::Running, false)]),
        MockProbe::unreachable(),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.pod_rollup, PodRollup::Pending);
    assert_eq!(status.llm_readiness(), LlmReadiness::Starting);
}

#[tokio::test]
async fn test_created_at_is_earliest_pod() {
    let h = harness(
        MockInventory::new(vec![
            running(MODEL_POD).with_created_at(created(11)),
            running(ROUTER_POD).with_created_at(created(9)),
        ]),
        MockProbe::unreachable(),
    );

    let status = h.reconciler.refresh(&demo()).await;

    assert_eq!(status.created_at, Some(created(9)));
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let h = harness(
        MockInventory::new(vec![
            pod(MODEL_POD, PodPhase::Running, false).with_created_at(created(10)),
            running(ROUTER_POD).with_created_at(created(10)),
        ]),
        MockProbe::listing(&["facebook/opt-125m"]),
    );

    let first = h.reconciler.refresh(&demo()).await;
    let mut second = h.reconciler.refresh(&demo()).await;
    second.last_refreshed_at = first.last_refreshed_at;

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn test_refresh_tracks_transitions() {
    let h = harness(
        MockInventory::new(vec![
            pod(MODEL_POD, PodPhase::Running, false),
            running(ROUTER_POD),
        ]),
        MockProbe::listing(&[]),
    );
    let identity = demo();

    let status = h.reconciler.refresh(&identity).await;
    assert_eq!(status.llm_readiness(), LlmReadiness::LoadingModel);

    h.probe.set_outcome(ProbeOutcome::Listed(vec!["facebook/opt-125m".to_string()]));
    h.reconciler.refresh(&identity).await;

    let stored = h.registry.get(&identity.id).unwrap();
    assert_eq!(stored.llm_readiness(), LlmReadiness::Ready);
    assert_eq!(stored.available_models, vec!["facebook/opt-125m"]);
}

#[tokio::test]
async fn test_concurrent_refreshes_of_one_deployment() {
    let h = harness(
        MockInventory::new(vec![running(MODEL_POD), running(ROUTER_POD)]),
        MockProbe::unreachable(),
    );
    let identity = demo();

    let (a, b) = tokio::join!(
        h.reconciler.refresh(&identity),
        h.reconciler.refresh(&identity)
    );

    assert_eq!(a.llm_readiness(), LlmReadiness::Ready);
    assert_eq!(b.llm_readiness(), LlmReadiness::Ready);
    assert_eq!(h.inventory.list_calls(), 2);
    assert_eq!(h.registry.len(), 1);
}

#[tokio::test]
async fn test_observe_does_not_write() {
    let h = harness(
        MockInventory::new(vec![running(MODEL_POD), running(ROUTER_POD)]),
        MockProbe::unreachable(),
    );

    let status = h.reconciler.observe(&demo()).await;

    assert!(status.is_ready());
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn test_cancelled_refresh_writes_nothing() {
    let h = harness(
        MockInventory::new(vec![running(MODEL_POD), running(ROUTER_POD)]),
        MockProbe::unreachable(),
    );
    let identity = demo();
    h.inventory.set_list_delay(Duration::from_millis(300));

    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), h.reconciler.refresh(&identity)).await;
    assert!(cancelled.is_err());
    assert!(h.registry.get(&identity.id).is_none());

    // an earlier record is left exactly as it was
    h.inventory.set_list_delay(Duration::ZERO);
    let before = h.reconciler.refresh(&identity).await;
    h.inventory.set_pods(vec![]);
    h.inventory.set_list_delay(Duration::from_millis(300));

    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), h.reconciler.refresh(&identity)).await;
    assert!(cancelled.is_err());
    assert_eq!(h.registry.get(&identity.id), Some(before));
}

#[tokio::test]
async fn test_refresh_never_resurrects_deleted_record() {
    let h = harness(
        MockInventory::new(vec![running(MODEL_POD), running(ROUTER_POD)]),
        MockProbe::unreachable(),
    );
    let identity = demo();
    assert!(h.registry.begin_delete(&identity));
    h.registry.set_lifecycle(&identity.id, Lifecycle::Deleted, None);

    let status = h.reconciler.refresh(&identity).await;

    assert_eq!(status.lifecycle, Lifecycle::Deleted);
    assert_eq!(status.llm_readiness(), LlmReadiness::Initializing);
    assert_eq!(h.registry.get(&identity.id).unwrap().lifecycle, Lifecycle::Deleted);
}

#[tokio::test]
async fn test_refresh_keeps_delete_failure() {
    let h = harness(
        MockInventory::new(vec![running(MODEL_POD), running(ROUTER_POD)]),
        MockProbe::unreachable(),
    );
    let identity = demo();
    assert!(h.registry.begin_delete(&identity));
    h.registry.set_lifecycle(
        &identity.id,
        Lifecycle::DeleteFailed,
        Some("helm uninstall demo failed: timed out".to_string()),
    );

    let status = h.reconciler.refresh(&identity).await;

    assert_eq!(status.lifecycle, Lifecycle::DeleteFailed);
    assert_eq!(status.llm_readiness(), LlmReadiness::Ready);
    assert_eq!(
        status.error.as_deref(),
        Some("helm uninstall demo failed: timed out")
    );
}

#[tokio::test]
async fn test_ui_status_always_follows_readiness() {
    let scenarios: Vec<(Arc<MockInventory>, Arc<MockProbe>)> = vec![
        (MockInventory::new(vec![running(MODEL_POD), running(ROUTER_POD)]), MockProbe::unreachable()),
        (MockInventory::new(vec![]), MockProbe::unreachable()),
        (MockInventory::failing("kubectl get pods failed"), MockProbe::unreachable()),
        (
            MockInventory::new(vec![pod(MODEL_POD, PodPhase::Running, false), running(ROUTER_POD)]),
            MockProbe::new(ProbeOutcome::Unparseable),
        ),
        (
            MockInventory::new(vec![pod(MODEL_POD, PodPhase::Running, false), running(ROUTER_POD)]),
            MockProbe::listing(&[]),
        ),
        (
            MockInventory::new(vec![pod(MODEL_POD, PodPhase::Running, false), running(ROUTER_POD)]),
            MockProbe::unreachable(),
        ),
    ];

    for (inventory, probe) in scenarios {
        let h = harness(inventory, probe);
        let status = h.reconciler.refresh(&demo()).await;
        assert_ui_consistent(&status);
        assert_ui_consistent(&h.registry.get(&demo().id).unwrap());
    }
}

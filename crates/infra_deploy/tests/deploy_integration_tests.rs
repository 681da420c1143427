//! Integration tests for the deployment flow.

use std::sync::Arc;

use infra_deploy::{DeployError, Deployer, MockEngine, StackOutput};
use infra_stack::{StackConfig, TemplateFormat};
use tempfile::tempdir;

fn outputs() -> Vec<StackOutput> {
    vec![
        StackOutput::new("ApplicationURL", "http://app-alb.example.com"),
        StackOutput::new("DatabaseName", "appdb"),
    ]
}

#[tokio::test]
async fn test_deploy_writes_template_then_reports_outputs() {
    let dir = tempdir().unwrap();
    let engine = MockEngine::new().with_outputs(outputs());
    let deployer = Deployer::new(Arc::new(engine.clone())).with_workdir(dir.path());

    let report = deployer.deploy(&StackConfig::default()).await.unwrap();

    assert_eq!(report.stack_name, "CdkInfraTestStack");
    assert_eq!(report.engine, "mock");
    assert_eq!(report.output("DatabaseName"), Some("appdb"));
    assert!(report.resource_count > 50);
    assert!(report.finished_at >= report.started_at);

    let path = report.template_path.unwrap();
    assert!(path.exists());
    assert_eq!(path, dir.path().join("CdkInfraTestStack.template.json"));

    let deploys = engine.get_method_calls("deploy");
    assert_eq!(deploys.len(), 1);
    assert!(deploys[0].template_present);
    assert!(engine.was_called("describe_outputs"));
}

#[tokio::test]
async fn test_deploy_uses_scratch_directory_by_default() {
    let engine = MockEngine::new();
    let deployer = Deployer::new(Arc::new(engine.clone())).with_format(TemplateFormat::Yaml);

    let report = deployer.deploy(&StackConfig::default()).await.unwrap();
    assert!(report.template_path.is_none());

    let call = &engine.get_method_calls("deploy")[0];
    assert!(call.template_present);
    let path = call.template_path.as_ref().unwrap();
    assert_eq!(path.extension().unwrap(), "yaml");
    assert!(!path.exists());
}

#[tokio::test]
async fn test_engine_failure_fails_whole_deployment() {
    let engine = MockEngine::new().fail_on("deploy", "ROLLBACK_COMPLETE");
    let deployer = Deployer::new(Arc::new(engine.clone()));

    let err = deployer.deploy(&StackConfig::default()).await.unwrap_err();
    match err {
        DeployError::DeploymentFailed(message) => assert!(message.contains("ROLLBACK_COMPLETE")),
        other => panic!("unexpected error: {}", other),
    }
    assert!(!engine.was_called("describe_outputs"));
}

#[tokio::test]
async fn test_output_failure_fails_whole_deployment() {
    let engine = MockEngine::new().fail_on("describe_outputs", "throttled");
    let deployer = Deployer::new(Arc::new(engine));

    assert!(matches!(
        deployer.deploy(&StackConfig::default()).await,
        Err(DeployError::DeploymentFailed(_))
    ));
}

#[tokio::test]
async fn test_unavailable_engine_is_reported() {
    let engine = MockEngine::new().set_available(false);
    let deployer = Deployer::new(Arc::new(engine.clone()));

    assert!(matches!(
        deployer.deploy(&StackConfig::default()).await,
        Err(DeployError::EngineUnavailable(_))
    ));
    assert!(!engine.was_called("deploy"));
}

#[tokio::test]
async fn test_invalid_config_never_reaches_engine() {
    let mut config = StackConfig::default();
    config.service.desired_count = 0;

    let engine = MockEngine::new();
    let deployer = Deployer::new(Arc::new(engine.clone()));

    assert!(matches!(deployer.deploy(&config).await, Err(DeployError::Synthesis(_))));
    assert!(!engine.was_called("deploy"));
}

#[tokio::test]
async fn test_unwritable_workdir_is_io_error() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();

    let engine = MockEngine::new();
    let deployer = Deployer::new(Arc::new(engine.clone())).with_workdir(&blocker);

    assert!(matches!(deployer.deploy(&StackConfig::default()).await, Err(DeployError::Io(_))));
    assert!(!engine.was_called("deploy"));
}

#[tokio::test]
async fn test_destroy_and_outputs() {
    let engine = MockEngine::new().with_deployed("CdkInfraTestStack").with_outputs(outputs());
    let deployer = Deployer::new(Arc::new(engine.clone()));

    assert_eq!(deployer.outputs("CdkInfraTestStack").await.unwrap().len(), 2);
    deployer.destroy("CdkInfraTestStack").await.unwrap();
    assert!(!engine.is_deployed("CdkInfraTestStack"));

    assert!(matches!(
        deployer.destroy("CdkInfraTestStack").await,
        Err(DeployError::StackNotFound(_))
    ));
}

use std::sync::atomic::AtomicUsize;

use cairn_config::ProviderSettings;
use cairn_nodetypes::CndReader;
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::memory::{MemoryRepository, MemoryUserDirectory};
use crate::naming::MemoryNamingContext;
use crate::repository::Value;

const DEFINITIONS: &str = r#"
<jnt = 'http://www.jahia.org/jahia/nt/1.0'>
[nt:base] abstract
[jnt:mountPoint] > nt:base
[jnt:virtualsitesFolder] > nt:base
"#;

fn registry() -> Arc<NodeTypeRegistry> {
	let registry = Arc::new(NodeTypeRegistry::new());
	CndReader::new(&registry, "base.cnd", "system-base")
		.parse(DEFINITIONS)
		.expect("definitions parse");
	registry
}

fn settings(configure: impl FnOnce(&mut ProviderSettings)) -> ProviderSettings {
	let mut settings = ProviderSettings::new("default", "/");
	settings.repository_name = Some("repo".to_string());
	configure(&mut settings);
	settings
}

fn provider_with(settings: ProviderSettings, repository: Arc<MemoryRepository>) -> StoreProvider {
	let naming = Arc::new(MemoryNamingContext::new());
	naming.rebind("repo", repository).unwrap();
	StoreProvider::new(settings, registry()).with_naming(naming)
}

#[rstest]
#[case::shared_without_guest_is_system(
	|s: &mut ProviderSettings| s.authentication = Some(AuthenticationMode::Shared),
	Credentials::trusted("alice"),
	" system ",
	None
)]
#[case::shared_with_guest_is_guest(
	|s: &mut ProviderSettings| { s.authentication = Some(AuthenticationMode::Shared); s.guest_user = Some("anonymous".into()); },
	Credentials::trusted("alice"),
	"anonymous",
	None
)]
#[case::system_sentinel_stays_system(
	|s: &mut ProviderSettings| { s.system_user = Some("root".into()); s.system_password = Some("secret".into()); s.guest_user = Some("anonymous".into()); },
	Credentials::system(),
	"root",
	Some("secret")
)]
#[case::guest_sentinel_becomes_guest_account(
	|s: &mut ProviderSettings| { s.guest_user = Some("anonymous".into()); s.guest_password = Some("guest".into()); },
	Credentials::guest(),
	"anonymous",
	Some("guest")
)]
#[case::no_mode_passes_through(|_: &mut ProviderSettings| {}, Credentials::new("alice", "pw"), "alice", Some("pw"))]
#[case::stored_password_is_used(
	|s: &mut ProviderSettings| { s.authentication = Some(AuthenticationMode::StoredPasswords); s.guest_user = Some("anonymous".into()); },
	Credentials::trusted("alice"),
	"alice-remote",
	Some("remote-pw")
)]
#[case::stored_password_missing_falls_back_to_guest(
	|s: &mut ProviderSettings| { s.authentication = Some(AuthenticationMode::StoredPasswords); s.guest_user = Some("anonymous".into()); },
	Credentials::trusted("bob"),
	"anonymous",
	None
)]
fn test_credentials_mapping(
	#[case] configure: fn(&mut ProviderSettings),
	#[case] given: Credentials,
	#[case] user: &str,
	#[case] password: Option<&str>,
) {
	let users = Arc::new(MemoryUserDirectory::new());
	users.set("alice", "storedUsername_default", "alice-remote");
	users.set("alice", "storedPassword_default", "remote-pw");
	let provider = provider_with(settings(configure), Arc::new(MemoryRepository::new())).with_users(users);

	let mapped = provider.map_credentials(&given);
	assert_eq!(mapped.user(), user);
	assert_eq!(mapped.password(), password);
}

#[test]
fn test_starting_forces_shared_authentication() {
	let provider = provider_with(
		settings(|s| s.authentication = Some(AuthenticationMode::StoredPasswords)),
		Arc::new(MemoryRepository::new()),
	);
	assert_eq!(provider.authentication_mode(), Some(AuthenticationMode::StoredPasswords));
	provider.starting.store(true, Ordering::Release);
	assert_eq!(provider.authentication_mode(), Some(AuthenticationMode::Shared));
	assert!(provider.map_credentials(&Credentials::trusted("alice")).is_system());
}

#[test]
fn test_repository_is_created_once_and_exported() {
	let repository = Arc::new(MemoryRepository::new());
	let naming = Arc::new(MemoryNamingContext::new());
	naming.rebind("repo", repository).unwrap();
	let provider = StoreProvider::new(settings(|s| s.rmi_bind = Some("//localhost/repo".into())), registry())
		.with_naming(naming.clone());

	let first = provider.repository().expect("repository");
	let second = provider.repository().expect("repository");
	assert!(Arc::ptr_eq(&first, &second));
	assert!(naming.is_bound("//localhost/repo"));
	assert!(!provider.set_repository(Arc::new(MemoryRepository::new())));
}

#[test]
fn test_remote_factory_failure_is_retried() {
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	let factories = RepositoryFactories::new().register(
		"memory",
		Box::new(move |_url: &str| {
			if counter.fetch_add(1, Ordering::SeqCst) < 2 {
				Err(StoreError::RepositoryAccess("connection refused".into()))
			} else {
				Ok(Arc::new(MemoryRepository::new()) as Arc<dyn Repository>)
			}
		}),
	);
	let mut remote = ProviderSettings::new("archive", "/mounts/archive");
	remote.factory = Some("memory".into());
	remote.url = Some("memory:archive".into());
	let provider = StoreProvider::new(remote, registry()).with_factories(Arc::new(factories));

	assert!(provider.repository().is_none());
	assert!(matches!(
		provider.get_session(&Credentials::system(), None),
		Err(StoreError::NoRepository(ref key)) if key == "archive"
	));
	assert!(provider.repository().is_some());
	assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_missing_locator_leaves_the_handle_to_the_caller() {
	let provider = StoreProvider::new(ProviderSettings::new("default", "/"), registry());
	assert!(provider.repository().is_none());
	assert!(!provider.is_versioning_available());
	assert!(provider.set_repository(Arc::new(MemoryRepository::new())));
	assert!(provider.repository().is_some());
}

#[test]
fn test_capabilities_follow_descriptors() {
	let repository = MemoryRepository::new()
		.with_descriptor(descriptors::VERSIONING_SUPPORTED, vec![Value::Boolean(true)])
		.with_descriptor(descriptors::SIMPLE_VERSIONING_SUPPORTED, vec![Value::from("true")])
		.with_descriptor(descriptors::LOCKING_SUPPORTED, vec![Value::Long(1)])
		.with_descriptor(descriptors::QUERY_LANGUAGES, vec![Value::from("xpath"), Value::from("sql2")]);
	let provider = provider_with(settings(|_| {}), Arc::new(repository));

	assert!(provider.is_versioning_available());
	assert!(!provider.is_locking_available(), "non-boolean descriptors read as unsupported");
	assert!(provider.is_search_available());
	assert!(!provider.is_update_mixin_available());
	provider.set_slow_connection(true);
	assert!(provider.is_slow_connection());
}

#[test]
fn test_versioning_needs_both_descriptors() {
	let repository =
		MemoryRepository::new().with_descriptor(descriptors::VERSIONING_SUPPORTED, vec![Value::Boolean(true)]);
	let provider = provider_with(settings(|_| {}), Arc::new(repository));
	assert!(!provider.is_versioning_available());
}

#[test]
fn test_start_creates_skeleton_and_observers() {
	let repository = Arc::new(MemoryRepository::new());
	let skeleton = vec![
		SkeletonEntry {
			path: "/sites".into(),
			primary_type: "jnt:virtualsitesFolder".into(),
			mixins: vec!["jmix:hasTemplateNode".into()],
		},
		SkeletonEntry {
			path: "/mounts/local".into(),
			primary_type: "jnt:mountPoint".into(),
			mixins: Vec::new(),
		},
		SkeletonEntry {
			path: "relative".into(),
			primary_type: "nt:unstructured".into(),
			mixins: Vec::new(),
		},
	];
	let provider = Arc::new(
		provider_with(
			settings(|s| {
				s.dynamic_mount_points = true;
				s.observed_workspaces = vec!["default".into(), "live".into()];
			}),
			repository.clone(),
		)
		.with_skeleton(skeleton),
	);
	let factory = SessionFactory::new();
	provider.start(&factory).expect("provider starts");

	assert!(provider.is_running());
	assert!(factory.provider("default").is_some());
	assert_eq!(repository.workspace("default").listener_count(), 1);
	assert_eq!(repository.workspace("live").listener_count(), 1);
	assert_eq!(provider.dynamic_mount_points(), vec!["/mounts/local".to_string()]);

	let session = repository.login(&Credentials::system(), None).unwrap();
	let root = session.root().unwrap();
	assert_eq!(root.mixin_types(), vec!["mix:referenceable".to_string()]);
	let sites = session.node("/sites").unwrap();
	assert_eq!(sites.primary_type(), "jnt:virtualsitesFolder");
	assert_eq!(sites.mixin_types(), vec!["jmix:hasTemplateNode".to_string()]);
	assert_eq!(session.node("/mounts").unwrap().primary_type(), "nt:unstructured");
	assert!(!root.has_child("relative"));

	provider.stop(&factory);
	assert!(!provider.is_running());
	assert!(factory.provider("default").is_none());
}

struct Counter(AtomicUsize);

impl EventListener for Counter {
	fn event_types(&self) -> EventMask {
		EventMask::NODE_ADDED
	}

	fn on_events(&self, _workspace: &str, events: &[crate::events::Event]) {
		self.0.fetch_add(events.len(), Ordering::SeqCst);
	}
}

#[test]
fn test_restart_observes_each_change_once() {
	let repository = Arc::new(MemoryRepository::new());
	let provider = Arc::new(provider_with(
		settings(|s| s.observed_workspaces = vec!["default".into()]),
		repository.clone(),
	));
	let counter = Arc::new(Counter(AtomicUsize::new(0)));
	provider.add_listener(counter.clone());
	let factory = SessionFactory::new();

	provider.start(&factory).expect("provider starts");
	provider.stop(&factory);
	assert_eq!(repository.workspace("default").listener_count(), 0);
	provider.start(&factory).expect("provider restarts");
	assert_eq!(repository.workspace("default").listener_count(), 1);

	let session = repository.login(&Credentials::system(), None).unwrap();
	session.root().unwrap().add_child("news", "nt:unstructured").unwrap();
	session.save().unwrap();
	assert_eq!(counter.0.load(Ordering::SeqCst), 1);

	provider.stop(&factory);
	session.root().unwrap().add_child("events", "nt:unstructured").unwrap();
	session.save().unwrap();
	assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[test]
fn test_existing_content_is_left_alone() {
	let repository = Arc::new(MemoryRepository::new());
	let session = repository.login(&Credentials::system(), None).unwrap();
	session.root().unwrap().add_child("sites", "nt:unstructured").unwrap();
	session.save().unwrap();

	let provider = Arc::new(
		provider_with(settings(|_| {}), repository.clone()).with_skeleton(vec![SkeletonEntry {
			path: "/users".into(),
			primary_type: "nt:unstructured".into(),
			mixins: Vec::new(),
		}]),
	);
	provider.start(&SessionFactory::new()).unwrap();
	assert!(!session.root().unwrap().has_child("users"));
}

#[test]
fn test_start_without_repository_fails() {
	let provider = Arc::new(StoreProvider::new(ProviderSettings::new("default", "/"), registry()));
	let factory = SessionFactory::new();
	let err = provider.start(&factory).expect_err("no repository");
	assert!(matches!(err, StoreError::Initialization { ref key, .. } if key == "default"));
	assert!(!provider.is_running());
	assert_eq!(provider.authentication_mode(), None);
}

#[test]
fn test_stop_unexports_the_repository() {
	let repository = Arc::new(MemoryRepository::new());
	let naming = Arc::new(MemoryNamingContext::new());
	naming.rebind("repo", repository).unwrap();
	let provider = Arc::new(
		StoreProvider::new(settings(|s| s.rmi_bind = Some("rmi-repo".into())), registry()).with_naming(naming.clone()),
	);
	let factory = SessionFactory::new();
	provider.start(&factory).unwrap();
	assert!(naming.is_bound("rmi-repo"));
	provider.stop(&factory);
	assert!(!naming.is_bound("rmi-repo"));
	// A second stop only warns.
	provider.stop(&factory);
}

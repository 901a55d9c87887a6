use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::repository::PropertyValue;

struct Recorder {
	seen: Mutex<Vec<(EventMask, String)>>,
}

impl EventListener for Recorder {
	fn event_types(&self) -> EventMask {
		EventMask::all()
	}

	fn on_events(&self, _workspace: &str, events: &[Event]) {
		self.seen.lock().extend(events.iter().map(|e| (e.kind, e.path.clone())));
	}
}

fn recorder() -> Arc<Recorder> {
	Arc::new(Recorder {
		seen: Mutex::new(Vec::new()),
	})
}

#[test]
fn test_tree_paths_and_identifiers() {
	let repository = MemoryRepository::new();
	let session = repository.login(&Credentials::system(), None).unwrap();
	let root = session.root().unwrap();
	assert_eq!(root.path(), "/");
	assert_eq!(root.primary_type(), "rep:root");

	let sites = root.add_child("sites", "jnt:virtualsitesFolder").unwrap();
	let home = sites.add_child("home", "jnt:page").unwrap();
	assert_eq!(home.path(), "/sites/home");
	assert_eq!(home.parent().unwrap().path(), "/sites");
	assert!(home.is_new());

	let by_id = session.node_by_identifier(&home.identifier()).unwrap();
	assert_eq!(by_id.path(), "/sites/home");
	assert_eq!(session.node("/sites/home").unwrap().name(), "home");
	assert!(matches!(session.node("/sites/missing"), Err(StoreError::PathNotFound(_))));
	assert!(matches!(session.node_by_identifier("nope"), Err(StoreError::ItemNotFound(_))));

	session.save().unwrap();
	assert!(!home.is_new());
	assert!(matches!(sites.add_child("home", "jnt:page"), Err(StoreError::ConstraintViolation(_))));
}

#[test]
fn test_properties_keep_insertion_order() {
	let repository = MemoryRepository::new();
	let session = repository.login(&Credentials::system(), None).unwrap();
	let node = session.root().unwrap().add_child("n", "nt:unstructured").unwrap();
	node.set_property("b", "2".into()).unwrap();
	node.set_property("a", PropertyValue::Multiple(vec![Value::Long(1), Value::Long(2)])).unwrap();
	node.add_mixin("mix:title").unwrap();

	let names: Vec<String> = node.properties().unwrap().iter().map(|p| p.name()).collect();
	assert_eq!(names, vec!["jcr:primaryType", "b", "a", "jcr:mixinTypes"]);
	assert_eq!(node.mixin_types(), vec!["mix:title".to_string()]);
	assert_eq!(node.property("b").unwrap().path(), "/n/b");
	assert!(node.set_property("jcr:primaryType", "x".into()).is_err());
}

#[rstest]
#[case(Credentials::system(), true)]
#[case(Credentials::guest(), true)]
#[case(Credentials::new("root", "secret"), true)]
#[case(Credentials::new("root", "wrong"), false)]
#[case(Credentials::trusted("root"), true)]
#[case(Credentials::trusted("nobody"), false)]
fn test_login_checks_accounts(#[case] credentials: Credentials, #[case] accepted: bool) {
	let repository = MemoryRepository::new().with_account("root", Some("secret"));
	assert_eq!(repository.login(&credentials, Some("live")).is_ok(), accepted);
}

#[test]
fn test_events_are_delivered_on_save() {
	let repository = MemoryRepository::new();
	let session = repository.login(&Credentials::system(), None).unwrap();
	let workspace = session.workspace();
	let all = recorder();
	let shallow = recorder();
	workspace.add_event_listener(all.clone(), EventMask::all(), "/", true).unwrap();
	workspace.add_event_listener(shallow.clone(), EventMask::NODE_ADDED, "/a", false).unwrap();

	let a = session.root().unwrap().add_child("a", "nt:unstructured").unwrap();
	let b = a.add_child("b", "nt:unstructured").unwrap();
	b.add_child("c", "nt:unstructured").unwrap();
	b.set_property("title", "t".into()).unwrap();
	b.set_property("title", "u".into()).unwrap();
	assert!(all.seen.lock().is_empty());

	session.save().unwrap();
	assert_eq!(
		*all.seen.lock(),
		vec![
			(EventMask::NODE_ADDED, "/a".to_string()),
			(EventMask::NODE_ADDED, "/a/b".to_string()),
			(EventMask::NODE_ADDED, "/a/b/c".to_string()),
			(EventMask::PROPERTY_ADDED, "/a/b/title".to_string()),
			(EventMask::PROPERTY_CHANGED, "/a/b/title".to_string()),
		]
	);
	assert_eq!(*shallow.seen.lock(), vec![(EventMask::NODE_ADDED, "/a/b".to_string())]);
}

#[test]
fn test_schema_manager_records_definitions() {
	let repository = MemoryRepository::new();
	let session = repository.login(&Credentials::system(), None).unwrap();
	let schema = session.workspace().schema().expect("schema support");
	schema.register_definitions("mod-a", "<jnt = 'j'>").unwrap();
	let manager = repository.schema_manager().unwrap();
	assert_eq!(manager.system_ids(), vec!["mod-a".to_string()]);
	assert!(schema.has_definitions("mod-a"));

	manager.reject_registrations(true);
	assert!(schema.register_definitions("mod-b", "").is_err());
	schema.unregister_definitions("mod-a").unwrap();
	assert!(manager.registered("mod-a").is_none());
	assert!(!schema.has_definitions("mod-a"));

	let bare = MemoryRepository::new().without_schema();
	assert!(bare.login(&Credentials::system(), None).unwrap().workspace().schema().is_none());
}

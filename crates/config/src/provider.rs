//! Store provider settings.

use serde::Deserialize;

/// How a provider maps application users onto its repository accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticationMode {
	/// Every login becomes the configured system or guest account.
	Shared,
	/// Per-user credentials are read from the user directory.
	StoredPasswords,
}

/// Where a provider's repository handle comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryLocator {
	/// Looked up by name in the naming context.
	Named(String),
	/// Built by a registered factory from a URL.
	Remote { factory: String, url: String },
}

/// One store provider, mounted at `mount_point`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
	pub key: String,
	#[serde(default = "root_mount_point")]
	pub mount_point: String,
	#[serde(default)]
	pub repository_name: Option<String>,
	#[serde(default)]
	pub factory: Option<String>,
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub system_user: Option<String>,
	#[serde(default)]
	pub system_password: Option<String>,
	#[serde(default)]
	pub guest_user: Option<String>,
	#[serde(default)]
	pub guest_password: Option<String>,
	#[serde(default)]
	pub authentication: Option<AuthenticationMode>,
	/// Name under which the repository handle is exported once created.
	#[serde(default)]
	pub rmi_bind: Option<String>,
	#[serde(default)]
	pub dynamic_mount_points: bool,
	#[serde(default = "default_workspaces")]
	pub observed_workspaces: Vec<String>,
}

fn root_mount_point() -> String {
	"/".to_string()
}

fn default_workspaces() -> Vec<String> {
	vec!["default".to_string()]
}

impl ProviderSettings {
	/// Provider with no repository locator, mounted at `mount_point`.
	pub fn new(key: impl Into<String>, mount_point: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			mount_point: mount_point.into(),
			repository_name: None,
			factory: None,
			url: None,
			system_user: None,
			system_password: None,
			guest_user: None,
			guest_password: None,
			authentication: None,
			rmi_bind: None,
			dynamic_mount_points: false,
			observed_workspaces: default_workspaces(),
		}
	}

	/// Effective authentication mode. Configuring a system user without a
	/// mode implies [`AuthenticationMode::Shared`].
	pub fn authentication_mode(&self) -> Option<AuthenticationMode> {
		self.authentication.or(self.system_user.as_ref().map(|_| AuthenticationMode::Shared))
	}

	/// Named lookup wins over a remote factory; `None` when neither is complete.
	pub fn locator(&self) -> Option<RepositoryLocator> {
		if let Some(name) = &self.repository_name {
			return Some(RepositoryLocator::Named(name.clone()));
		}
		match (&self.factory, &self.url) {
			(Some(factory), Some(url)) => Some(RepositoryLocator::Remote {
				factory: factory.clone(),
				url: url.clone(),
			}),
			_ => None,
		}
	}

	/// True for the provider mounted at `/`.
	pub fn is_default(&self) -> bool {
		self.mount_point == "/"
	}

	/// Number of path segments below the root.
	pub fn depth(&self) -> usize {
		if self.is_default() {
			return 0;
		}
		self.mount_point.split('/').filter(|s| !s.is_empty()).count()
	}
}

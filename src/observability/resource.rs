//! Identity of the running process, shared by logs, traces and metrics.

use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use uuid::Uuid;

use crate::config::Environment;

#[derive(Debug, Clone)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub host_name: String,
    pub user_name: String,
    pub instance_id: Uuid,
}

impl AppInfo {
    pub fn new(environment: &Environment) -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: environment.name().to_string(),
            host_name: first_var(&["HOSTNAME", "COMPUTERNAME"]),
            user_name: first_var(&["USER", "USERNAME"]),
            instance_id: Uuid::new_v4(),
        }
    }

    /// `User-Agent` for outbound requests.
    pub fn user_agent(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }

    /// OpenTelemetry resource attached to exported traces and logs.
    pub fn resource(&self) -> Resource {
        Resource::builder()
            .with_service_name(self.name.clone())
            .with_attributes([
                KeyValue::new("service.version", self.version.clone()),
                KeyValue::new("service.instance.id", self.instance_id.to_string()),
                KeyValue::new("deployment.environment", self.environment.clone()),
                KeyValue::new("host.name", self.host_name.clone()),
                KeyValue::new("enduser.id", self.user_name.clone()),
            ])
            .build()
    }
}

fn first_var(names: &[&str]) -> String {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_package() {
        let info = AppInfo::new(&Environment::new("Staging"));
        assert_eq!(info.name, "agent");
        assert_eq!(info.environment, "Staging");
        assert!(info.user_agent().starts_with("agent/"));
    }
}

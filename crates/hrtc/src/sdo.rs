// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SDO management surface: device profile, service profiles, organizations.

use crate::broker::Servant;
use crate::error::{RtcError, RtcResult};
use crate::properties::Properties;
use parking_lot::RwLock;
use std::fmt;

/// Hardware description of the device hosting a component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceProfile {
    pub device_type: String,
    pub manufacturer: String,
    pub model: String,
    pub version: String,
    pub properties: Properties,
}

/// A service attached to the component's management surface.
#[derive(Clone)]
pub struct ServiceProfile {
    pub id: String,
    pub interface_type: String,
    pub properties: Properties,
    pub service: Option<Servant>,
}

impl ServiceProfile {
    pub fn new(id: &str, interface_type: &str) -> Self {
        Self {
            id: id.to_string(),
            interface_type: interface_type.to_string(),
            properties: Properties::new(),
            service: None,
        }
    }
}

impl fmt::Debug for ServiceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProfile")
            .field("id", &self.id)
            .field("interface_type", &self.interface_type)
            .field("properties", &self.properties)
            .field("service", &self.service.is_some())
            .finish()
    }
}

/// How the owner of an organization relates to its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyType {
    /// Members depend on the owner.
    Owner,
    /// The owner depends on the members.
    OwnedBy,
    #[default]
    NoDependency,
}

/// A group of components with an owner and a dependency relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
    pub owner: String,
    pub members: Vec<String>,
    pub dependency: DependencyType,
    pub properties: Properties,
}

impl Organization {
    pub fn new(id: &str, owner: &str) -> Self {
        Self {
            id: id.to_string(),
            owner: owner.to_string(),
            ..Self::default()
        }
    }

    /// Add members that are not already present.
    pub fn add_members(&mut self, members: &[&str]) {
        for m in members {
            if !self.members.iter().any(|x| x == m) {
                self.members.push((*m).to_string());
            }
        }
    }

    pub fn remove_member(&mut self, member: &str) -> RtcResult<()> {
        let idx = self
            .members
            .iter()
            .position(|m| m == member)
            .ok_or_else(|| {
                RtcError::bad_param(format!("{} is not a member of {}", member, self.id))
            })?;
        self.members.remove(idx);
        Ok(())
    }
}

/// Per-component SDO state.
#[derive(Default)]
pub struct SdoConfiguration {
    device_profile: RwLock<DeviceProfile>,
    service_profiles: RwLock<Vec<ServiceProfile>>,
    organizations: RwLock<Vec<Organization>>,
}

impl SdoConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_device_profile(&self, profile: DeviceProfile) {
        *self.device_profile.write() = profile;
    }

    pub fn get_device_profile(&self) -> DeviceProfile {
        self.device_profile.read().clone()
    }

    /// Add a service profile, replacing one with the same id. An empty id is
    /// replaced by a fresh UUID, which is returned.
    pub fn add_service_profile(&self, mut profile: ServiceProfile) -> String {
        if profile.id.is_empty() {
            profile.id = uuid::Uuid::new_v4().to_string();
        }
        let id = profile.id.clone();
        let mut profiles = self.service_profiles.write();
        match profiles.iter_mut().find(|p| p.id == id) {
            Some(existing) => *existing = profile,
            None => profiles.push(profile),
        }
        id
    }

    pub fn remove_service_profile(&self, id: &str) -> RtcResult<()> {
        let mut profiles = self.service_profiles.write();
        let idx = profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| RtcError::bad_param(format!("no service profile {}", id)))?;
        profiles.remove(idx);
        Ok(())
    }

    pub fn get_service_profile(&self, id: &str) -> RtcResult<ServiceProfile> {
        self.service_profiles
            .read()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| RtcError::bad_param(format!("no service profile {}", id)))
    }

    pub fn get_service_profiles(&self) -> Vec<ServiceProfile> {
        self.service_profiles.read().clone()
    }

    pub fn add_organization(&self, org: Organization) -> RtcResult<()> {
        if org.id.is_empty() {
            return Err(RtcError::bad_param("organization id is empty"));
        }
        let mut orgs = self.organizations.write();
        if orgs.iter().any(|o| o.id == org.id) {
            return Err(RtcError::bad_param(format!("organization {} exists", org.id)));
        }
        orgs.push(org);
        Ok(())
    }

    pub fn remove_organization(&self, id: &str) -> RtcResult<()> {
        let mut orgs = self.organizations.write();
        let idx = orgs
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| RtcError::bad_param(format!("no organization {}", id)))?;
        orgs.remove(idx);
        Ok(())
    }

    pub fn get_organization(&self, id: &str) -> RtcResult<Organization> {
        self.organizations
            .read()
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| RtcError::bad_param(format!("no organization {}", id)))
    }

    pub fn get_organizations(&self) -> Vec<Organization> {
        self.organizations.read().clone()
    }

    /// Modify an organization in place.
    pub fn update_organization<F>(&self, id: &str, f: F) -> RtcResult<()>
    where
        F: FnOnce(&mut Organization) -> RtcResult<()>,
    {
        let mut orgs = self.organizations.write();
        let org = orgs
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| RtcError::bad_param(format!("no organization {}", id)))?;
        f(org)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_service_profiles_replace_by_id() {
        let sdo = SdoConfiguration::new();
        let id = sdo.add_service_profile(ServiceProfile::new("", "Logger"));
        assert!(!id.is_empty());
        let mut replaced = ServiceProfile::new(&id, "Logger2");
        replaced.service = Some(Arc::new(5_u32));
        sdo.add_service_profile(replaced);
        assert_eq!(sdo.get_service_profiles().len(), 1);
        assert_eq!(sdo.get_service_profile(&id).expect("get").interface_type, "Logger2");
        sdo.remove_service_profile(&id).expect("remove");
        assert!(sdo.remove_service_profile(&id).is_err());
    }

    #[test]
    fn test_organizations() {
        let sdo = SdoConfiguration::new();
        assert!(sdo.add_organization(Organization::new("", "a")).is_err());
        sdo.add_organization(Organization::new("grp", "a")).expect("add");
        assert!(sdo.add_organization(Organization::new("grp", "b")).is_err());
        sdo.update_organization("grp", |o| {
            o.add_members(&["x", "y", "x"]);
            o.dependency = DependencyType::Owner;
            Ok(())
        })
        .expect("update");
        let org = sdo.get_organization("grp").expect("get");
        assert_eq!(org.members, vec!["x".to_string(), "y".to_string()]);
        sdo.update_organization("grp", |o| o.remove_member("x")).expect("remove");
        assert!(sdo.update_organization("grp", |o| o.remove_member("x")).is_err());
        sdo.remove_organization("grp").expect("remove");
        assert!(sdo.get_organizations().is_empty());
    }

    #[test]
    fn test_device_profile() {
        let sdo = SdoConfiguration::new();
        sdo.set_device_profile(DeviceProfile {
            device_type: "arm".into(),
            manufacturer: "acme".into(),
            ..DeviceProfile::default()
        });
        assert_eq!(sdo.get_device_profile().manufacturer, "acme");
    }
}

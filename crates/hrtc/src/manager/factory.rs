// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Component and execution-context factories, plus component spec strings.

use crate::broker::{ObjectBroker, ObjectId};
use crate::ec::{
    ExecutionContext, ExtTrigExecutionContext, PeriodicExecutionContext, EXT_TRIG_EC, PERIODIC_EC,
};
use crate::error::{RtcError, RtcResult};
use crate::properties::Properties;
use crate::rtc::{ComponentBehavior, RtObject};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Builds the behavior of a freshly created component. The component is
/// passed so the constructor can add ports and bind parameters.
pub type ComponentCtor =
    Arc<dyn Fn(&Arc<RtObject>) -> RtcResult<Box<dyn ComponentBehavior>> + Send + Sync>;

/// Called once a component created by the factory is destroyed.
pub type ComponentDtor = Arc<dyn Fn(&Arc<RtObject>) + Send + Sync>;

pub type EcCtor = Arc<dyn Fn(&Properties) -> RtcResult<Arc<dyn ExecutionContext>> + Send + Sync>;
pub type EcDtor = Arc<dyn Fn(&Arc<dyn ExecutionContext>) + Send + Sync>;

/// `language` recorded for factories that do not name one.
pub const DEFAULT_LANGUAGE: &str = "Rust";

/// Factory of one component type.
///
/// The profile carries at least `type_name`; `max_instance` (0 or absent
/// means unlimited) bounds the number of live instances.
pub struct ComponentFactory {
    profile: Properties,
    ctor: ComponentCtor,
    dtor: Option<ComponentDtor>,
    slots: Mutex<Vec<Option<ObjectId>>>,
}

impl ComponentFactory {
    pub fn new(
        mut profile: Properties,
        ctor: ComponentCtor,
        dtor: Option<ComponentDtor>,
    ) -> RtcResult<Self> {
        if profile.get_property("type_name").is_empty() {
            return Err(RtcError::bad_param("factory profile without type_name"));
        }
        if profile.get_property("language").is_empty() {
            profile.set_property("language", DEFAULT_LANGUAGE);
        }
        Ok(Self {
            profile,
            ctor,
            dtor,
            slots: Mutex::new(Vec::new()),
        })
    }

    pub fn profile(&self) -> &Properties {
        &self.profile
    }

    pub fn type_name(&self) -> &str {
        self.profile.get_property("type_name")
    }

    pub fn max_instance(&self) -> usize {
        self.profile
            .get_property("max_instance")
            .trim()
            .parse()
            .unwrap_or(0)
    }

    /// Number of live instances.
    pub fn instance_count(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }

    /// True when `spec` names this factory.
    pub fn matches(&self, spec: &ComponentSpec) -> bool {
        let field_ok = |key: &str, wanted: &str| {
            wanted.is_empty() || wanted == "*" || self.profile.get_property(key) == wanted
        };
        self.type_name() == spec.implementation_id
            && field_ok("vendor", &spec.vendor)
            && field_ok("category", &spec.category)
            && field_ok("language", &spec.language)
            && field_ok("version", &spec.version)
    }

    /// Instantiate a component named `<type_name><n>` with `n` the lowest
    /// free slot.
    pub fn create(&self, broker: Arc<ObjectBroker>) -> RtcResult<Arc<RtObject>> {
        let slot = {
            let mut slots = self.slots.lock();
            let live = slots.iter().filter(|s| s.is_some()).count();
            let max = self.max_instance();
            if max > 0 && live >= max {
                return Err(RtcError::OutOfResources(format!(
                    "{} reached max_instance {}",
                    self.type_name(),
                    max
                )));
            }
            let comp_id = ObjectId::next();
            match slots.iter().position(Option::is_none) {
                Some(i) => {
                    slots[i] = Some(comp_id);
                    i
                }
                None => {
                    slots.push(Some(comp_id));
                    slots.len() - 1
                }
            }
        };

        let mut props = self.profile.clone();
        props.set_property("instance_name", &format!("{}{}", self.type_name(), slot));
        let comp = RtObject::new(broker, props);
        self.slots.lock()[slot] = Some(comp.id());

        match (self.ctor)(&comp) {
            Ok(behavior) => {
                comp.set_behavior(behavior);
                log::debug!(
                    "[ComponentFactory::create] {} -> {}",
                    self.type_name(),
                    comp.instance_name()
                );
                Ok(comp)
            }
            Err(e) => {
                self.release_slot(comp.id());
                Err(e)
            }
        }
    }

    /// Run the destructor and free the instance slot.
    pub fn destroy(&self, comp: &Arc<RtObject>) {
        if let Some(dtor) = &self.dtor {
            dtor(comp);
        }
        self.release_slot(comp.id());
        log::debug!("[ComponentFactory::destroy] {}", comp.instance_name());
    }

    fn release_slot(&self, id: ObjectId) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter_mut().find(|s| **s == Some(id)) {
            *slot = None;
        }
    }
}

/// Parsed component spec string.
///
/// Accepted forms:
///
/// ```text
/// Echo
/// Echo?instance_name=echo0&exec_cxt.periodic.rate=10
/// RTC:vendor:category:Echo:Rust:1.0?instance_name=echo0
/// ```
#[derive(Debug, Clone, Default)]
pub struct ComponentSpec {
    pub implementation_id: String,
    pub vendor: String,
    pub category: String,
    pub language: String,
    pub version: String,
    /// `key=value` parameters after `?`.
    pub params: Properties,
}

impl ComponentSpec {
    pub fn parse(spec: &str) -> RtcResult<Self> {
        let (id_part, query) = match spec.split_once('?') {
            Some((id, q)) => (id.trim(), q),
            None => (spec.trim(), ""),
        };

        let fields: Vec<&str> = id_part.split(':').map(str::trim).collect();
        let mut out = match fields.as_slice() {
            [impl_id] => Self {
                implementation_id: (*impl_id).to_string(),
                ..Self::default()
            },
            ["RTC", vendor, category, impl_id, language, version] => Self {
                implementation_id: (*impl_id).to_string(),
                vendor: (*vendor).to_string(),
                category: (*category).to_string(),
                language: (*language).to_string(),
                version: (*version).to_string(),
                ..Self::default()
            },
            _ => {
                return Err(RtcError::bad_param(format!("malformed component id '{}'", id_part)));
            }
        };
        if out.implementation_id.is_empty() {
            return Err(RtcError::bad_param("empty implementation id"));
        }

        for pair in query.split('&').filter(|p| !p.trim().is_empty()) {
            match pair.split_once('=') {
                Some((k, v)) if !k.trim().is_empty() => {
                    out.params.set_property(k.trim(), v.trim());
                }
                _ => log::warn!("[ComponentSpec::parse] ignoring parameter '{}'", pair),
            }
        }
        Ok(out)
    }
}

struct EcFactory {
    ctor: EcCtor,
    dtor: Option<EcDtor>,
}

/// Execution-context factories keyed by context type name.
pub struct EcFactoryTable {
    factories: DashMap<String, EcFactory>,
}

impl EcFactoryTable {
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
        }
    }

    /// Table with the periodic and externally triggered contexts registered.
    pub fn with_builtins() -> Self {
        let table = Self::new();
        table.insert(
            PERIODIC_EC,
            Arc::new(|p: &Properties| {
                PeriodicExecutionContext::new(p).map(|ec| ec as Arc<dyn ExecutionContext>)
            }),
            None,
        );
        table.insert(
            EXT_TRIG_EC,
            Arc::new(|p: &Properties| {
                ExtTrigExecutionContext::new(p).map(|ec| ec as Arc<dyn ExecutionContext>)
            }),
            None,
        );
        table
    }

    fn insert(&self, name: &str, ctor: EcCtor, dtor: Option<EcDtor>) {
        self.factories.insert(name.to_string(), EcFactory { ctor, dtor });
    }

    /// Register `name`; an existing entry is an error.
    pub fn register(&self, name: &str, ctor: EcCtor, dtor: Option<EcDtor>) -> RtcResult<()> {
        if name.is_empty() {
            return Err(RtcError::bad_param("empty execution context type"));
        }
        match self.factories.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RtcError::precondition(format!(
                "execution context type {} already registered",
                name
            ))),
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(EcFactory { ctor, dtor });
                log::debug!("[EcFactoryTable::register] {}", name);
                Ok(())
            }
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn create(&self, name: &str, props: &Properties) -> RtcResult<Arc<dyn ExecutionContext>> {
        // Clone the constructor out so the shard lock is not held while it runs.
        let ctor = self
            .factories
            .get(name)
            .map(|f| f.ctor.clone())
            .ok_or_else(|| RtcError::NotFound(format!("execution context type {}", name)))?;
        ctor(props)
    }

    /// Run the destructor registered for `name`, if any.
    pub fn destroy(&self, name: &str, ec: &Arc<dyn ExecutionContext>) {
        let dtor = self.factories.get(name).and_then(|f| f.dtor.clone());
        if let Some(dtor) = dtor {
            dtor(ec);
        }
    }
}

impl Default for EcFactoryTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtc::NoBehavior;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn factory(max: &str, dtor: Option<ComponentDtor>) -> ComponentFactory {
        let profile = Properties::from_pairs(&[
            ("type_name", "Echo"),
            ("vendor", "acme"),
            ("category", "test"),
            ("max_instance", max),
        ]);
        ComponentFactory::new(
            profile,
            Arc::new(|_: &Arc<RtObject>| Ok(Box::new(NoBehavior) as Box<dyn ComponentBehavior>)),
            dtor,
        )
        .expect("factory")
    }

    #[test]
    fn test_spec_short_form() {
        let spec = ComponentSpec::parse("Echo?instance_name=e1&conf.default.gain=2").expect("spec");
        assert_eq!(spec.implementation_id, "Echo");
        assert_eq!(spec.params.get_property("instance_name"), "e1");
        assert_eq!(spec.params.get_property("conf.default.gain"), "2");
    }

    #[test]
    fn test_spec_long_form() {
        let spec =
            ComponentSpec::parse("RTC:acme:test:Echo:Rust:1.0?instance_name=e1").expect("spec");
        assert_eq!(spec.implementation_id, "Echo");
        assert_eq!(spec.vendor, "acme");
        assert_eq!(spec.version, "1.0");
        assert_eq!(spec.params.get_property("instance_name"), "e1");
    }

    #[test]
    fn test_spec_rejects_malformed() {
        assert!(ComponentSpec::parse("").is_err());
        assert!(ComponentSpec::parse("a:b").is_err());
        assert!(ComponentSpec::parse("?instance_name=x").is_err());
    }

    #[test]
    fn test_matches_vendor_and_category() {
        let f = factory("0", None);
        assert!(f.matches(&ComponentSpec::parse("Echo").expect("spec")));
        assert!(f.matches(&ComponentSpec::parse("RTC:acme:test:Echo::").expect("spec")));
        assert!(!f.matches(&ComponentSpec::parse("RTC:other:test:Echo::").expect("spec")));
        assert!(!f.matches(&ComponentSpec::parse("Gain").expect("spec")));
    }

    #[test]
    fn test_language_defaults_to_rust() {
        let f = factory("0", None);
        assert_eq!(f.profile().get_property("language"), DEFAULT_LANGUAGE);
        assert!(f.matches(&ComponentSpec::parse("RTC:acme:test:Echo:Rust:").expect("spec")));
        assert!(!f.matches(&ComponentSpec::parse("RTC:acme:test:Echo:C++:").expect("spec")));
    }

    #[test]
    fn test_default_names_reuse_slots() {
        let broker = ObjectBroker::new();
        let f = factory("0", None);
        let a = f.create(broker.clone()).expect("a");
        let b = f.create(broker.clone()).expect("b");
        assert_eq!(a.instance_name(), "Echo0");
        assert_eq!(b.instance_name(), "Echo1");
        f.destroy(&a);
        let c = f.create(broker).expect("c");
        assert_eq!(c.instance_name(), "Echo0");
        assert_eq!(f.instance_count(), 2);
    }

    #[test]
    fn test_max_instance() {
        let broker = ObjectBroker::new();
        let destroyed = Arc::new(AtomicUsize::new(0));
        let d = destroyed.clone();
        let f = factory(
            "1",
            Some(Arc::new(move |_: &Arc<RtObject>| {
                d.fetch_add(1, Ordering::SeqCst);
            })),
        );
        let a = f.create(broker.clone()).expect("a");
        assert!(matches!(f.create(broker.clone()), Err(RtcError::OutOfResources(_))));
        f.destroy(&a);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert!(f.create(broker).is_ok());
    }

    #[test]
    fn test_ec_table() {
        let table = EcFactoryTable::with_builtins();
        assert_eq!(table.names(), vec![EXT_TRIG_EC.to_string(), PERIODIC_EC.to_string()]);
        let ec = table
            .create(PERIODIC_EC, &Properties::from_pairs(&[("rate", "50")]))
            .expect("ec");
        assert_eq!(ec.get_rate(), 50.0);
        assert!(matches!(
            table.create("Missing", &Properties::new()),
            Err(RtcError::NotFound(_))
        ));
        assert!(table
            .register(PERIODIC_EC, Arc::new(|_: &Properties| Err(RtcError::Error)), None)
            .is_err());
    }
}

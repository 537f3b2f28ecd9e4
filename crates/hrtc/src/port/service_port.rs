// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service ports: provided and required service interfaces.
//!
//! A provided interface is a servant registered with the broker; its key is
//! published as `port.<type>.<instance>` and as
//! `<comp>.port.<port>.provided.<type>.<instance>`. A required interface is a
//! [`ServiceConsumer`] placeholder, bound while subscribing by, in order:
//!
//! 1. an explicit mapping `<comp>.port.<port>.required.<type>.<instance>`
//!    whose value names a provided descriptor,
//! 2. a provider with the same type and instance name,
//! 3. the first provider of the same type.
//!
//! Type and instance names must not contain `.`.

use super::base::{Port, PortBase};
use super::{ConnectorProfile, PortInterfacePolarity, PortService};
use crate::broker::{ObjectBroker, ObjectId, Servant};
use crate::error::{RtcError, RtcResult};
use arc_swap::ArcSwapOption;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::sync::{Arc, Weak};

/// Placeholder for a required interface of type `T`.
///
/// Clones share the binding.
pub struct ServiceConsumer<T: Any + Send + Sync> {
    slot: Arc<ArcSwapOption<T>>,
}

impl<T: Any + Send + Sync> ServiceConsumer<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// Bound provider, if connected.
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.load_full()
    }

    pub fn is_bound(&self) -> bool {
        self.slot.load().is_some()
    }
}

impl<T: Any + Send + Sync> Default for ServiceConsumer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any + Send + Sync> Clone for ServiceConsumer<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

trait ConsumerSlot: Send + Sync {
    fn bind(&self, servant: Servant) -> RtcResult<()>;
    fn unbind(&self);
}

impl<T: Any + Send + Sync> ConsumerSlot for ServiceConsumer<T> {
    fn bind(&self, servant: Servant) -> RtcResult<()> {
        let typed = servant
            .downcast::<T>()
            .map_err(|_| RtcError::bad_param("provider type does not match consumer"))?;
        self.slot.store(Some(typed));
        Ok(())
    }

    fn unbind(&self) {
        self.slot.store(None);
    }
}

struct Provided {
    instance_name: String,
    type_name: String,
    servant: Servant,
    key: Mutex<Option<ObjectId>>,
}

impl Provided {
    fn activate(&self, broker: &ObjectBroker) -> ObjectId {
        let mut key = self.key.lock();
        match *key {
            Some(id) if broker.resolve(id).is_some() => id,
            _ => {
                let id = broker.activate_servant(self.servant.clone());
                *key = Some(id);
                id
            }
        }
    }
}

struct Required {
    instance_name: String,
    type_name: String,
    slot: Box<dyn ConsumerSlot>,
    bound_by: Mutex<Option<String>>,
}

/// Port exposing service interfaces.
pub struct ServicePort {
    base: PortBase,
    provided: RwLock<Vec<Provided>>,
    required: RwLock<Vec<Required>>,
}

fn check_name(kind: &str, name: &str) -> RtcResult<()> {
    if name.is_empty() || name.contains('.') {
        return Err(RtcError::bad_param(format!("invalid {} '{}'", kind, name)));
    }
    Ok(())
}

impl ServicePort {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let this: Weak<dyn PortService> = weak.clone();
            let base = PortBase::new(name, this);
            base.set_property("port.port_type", "CorbaPort");
            Self {
                base,
                provided: RwLock::new(Vec::new()),
                required: RwLock::new(Vec::new()),
            }
        })
    }

    /// Offer `servant` as interface `instance_name` of type `type_name`.
    pub fn register_provider<T: Any + Send + Sync>(
        &self,
        instance_name: &str,
        type_name: &str,
        servant: Arc<T>,
    ) -> RtcResult<()> {
        check_name("instance name", instance_name)?;
        check_name("type name", type_name)?;
        self.base
            .add_interface(instance_name, type_name, PortInterfacePolarity::Provided)?;
        self.provided.write().push(Provided {
            instance_name: instance_name.to_string(),
            type_name: type_name.to_string(),
            servant,
            key: Mutex::new(None),
        });
        Ok(())
    }

    /// Require interface `instance_name` of type `type_name`, bound into `consumer`.
    pub fn register_consumer<T: Any + Send + Sync>(
        &self,
        instance_name: &str,
        type_name: &str,
        consumer: &ServiceConsumer<T>,
    ) -> RtcResult<()> {
        check_name("instance name", instance_name)?;
        check_name("type name", type_name)?;
        self.base
            .add_interface(instance_name, type_name, PortInterfacePolarity::Required)?;
        self.required.write().push(Required {
            instance_name: instance_name.to_string(),
            type_name: type_name.to_string(),
            slot: Box::new(consumer.clone()),
            bound_by: Mutex::new(None),
        });
        Ok(())
    }

    /// `<comp>.port.<port>.<polarity>.<type>.<instance>`
    fn descriptor(&self, polarity: &str, type_name: &str, instance_name: &str) -> String {
        format!(
            "{}.port.{}.{}.{}.{}",
            self.base.owner(),
            self.base.short_name(),
            polarity,
            type_name,
            instance_name
        )
    }

    fn find_provider_key(&self, profile: &ConnectorProfile, req: &Required) -> Option<String> {
        let prop = &profile.properties;
        let descriptor = self.descriptor("required", &req.type_name, &req.instance_name);
        let mapped = prop.get_property(&descriptor);
        if !mapped.is_empty() {
            let key = prop.get_property(mapped);
            if !key.is_empty() {
                return Some(key.to_string());
            }
            log::warn!("[ServicePort] mapping {} -> {} names no provider", descriptor, mapped);
        }

        let exact = prop.get_property(&format!("port.{}.{}", req.type_name, req.instance_name));
        if !exact.is_empty() {
            return Some(exact.to_string());
        }

        prop.find_node(&format!("port.{}", req.type_name))
            .and_then(|node| node.leaves().iter().find(|leaf| !leaf.value().is_empty()))
            .map(|leaf| leaf.value().to_string())
    }
}

impl Port for ServicePort {
    fn base(&self) -> &PortBase {
        &self.base
    }

    fn publish_interfaces(&self, profile: &mut ConnectorProfile) -> RtcResult<()> {
        let provided = self.provided.read();
        if provided.is_empty() {
            return Ok(());
        }
        let broker = self.base.broker()?;
        for p in provided.iter() {
            let key = p.activate(&broker).to_string();
            profile
                .properties
                .set_property(&format!("port.{}.{}", p.type_name, p.instance_name), &key);
            profile.properties.set_property(
                &self.descriptor("provided", &p.type_name, &p.instance_name),
                &key,
            );
        }
        Ok(())
    }

    fn subscribe_interfaces(&self, profile: &ConnectorProfile) -> RtcResult<()> {
        let required = self.required.read();
        if required.is_empty() {
            return Ok(());
        }
        let broker = self.base.broker()?;
        let mut result = Ok(());
        for req in required.iter() {
            let bound = self
                .find_provider_key(profile, req)
                .ok_or_else(|| {
                    RtcError::bad_param(format!(
                        "no provider for {}.{}",
                        req.type_name, req.instance_name
                    ))
                })
                .and_then(|key| {
                    let id: ObjectId = key.parse()?;
                    broker
                        .resolve(id)
                        .ok_or_else(|| RtcError::NotFound(format!("object {}", key)))
                })
                .and_then(|servant| req.slot.bind(servant));
            match bound {
                Ok(()) => {
                    *req.bound_by.lock() = Some(profile.connector_id.clone());
                    log::debug!(
                        "[ServicePort::subscribe] {} bound {}.{}",
                        self.base.full_name(),
                        req.type_name,
                        req.instance_name
                    );
                }
                Err(e) => {
                    log::warn!("[ServicePort::subscribe] {}: {}", self.base.full_name(), e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }

    fn unsubscribe_interfaces(&self, profile: &ConnectorProfile) {
        for req in self.required.read().iter() {
            let mut bound_by = req.bound_by.lock();
            if bound_by.as_deref() == Some(profile.connector_id.as_str()) {
                req.slot.unbind();
                *bound_by = None;
            }
        }
    }

    fn release(&self) {
        let Ok(broker) = self.base.broker() else {
            return;
        };
        for p in self.provided.read().iter() {
            if let Some(id) = p.key.lock().take() {
                broker.deactivate_object(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::connect_ports;

    struct Calculator {
        offset: i32,
    }

    impl Calculator {
        fn add(&self, v: i32) -> i32 {
            v + self.offset
        }
    }

    fn attached(owner: &str, name: &str, broker: &Arc<ObjectBroker>) -> Arc<ServicePort> {
        let port = ServicePort::new(name);
        port.attach(owner, broker.clone());
        port
    }

    #[test]
    fn test_consumer_bound_by_instance_name() {
        let broker = ObjectBroker::new();
        let server = attached("server0", "calc", &broker);
        let client = attached("client0", "calc", &broker);
        server
            .register_provider("adder", "Calculator", Arc::new(Calculator { offset: 10 }))
            .expect("provider");
        let calc = ServiceConsumer::<Calculator>::new();
        client
            .register_consumer("adder", "Calculator", &calc)
            .expect("consumer");

        let a: Arc<dyn PortService> = server.clone();
        let b: Arc<dyn PortService> = client.clone();
        let profile = connect_ports("svc", &[&a, &b], &[]).expect("connect");
        assert_eq!(calc.get().map(|c| c.add(1)), Some(11));
        assert!(!profile.properties.get_property("port.Calculator.adder").is_empty());
        assert!(profile
            .properties
            .has_key("server0.port.calc.provided.Calculator.adder"));

        a.disconnect(&profile.connector_id).expect("disconnect");
        assert!(!calc.is_bound());
    }

    #[test]
    fn test_explicit_mapping_wins() {
        let broker = ObjectBroker::new();
        let server = attached("server0", "calc", &broker);
        let client = attached("client0", "calc", &broker);
        server
            .register_provider("one", "Calculator", Arc::new(Calculator { offset: 1 }))
            .expect("provider");
        server
            .register_provider("two", "Calculator", Arc::new(Calculator { offset: 2 }))
            .expect("provider");
        let calc = ServiceConsumer::<Calculator>::new();
        client
            .register_consumer("one", "Calculator", &calc)
            .expect("consumer");

        let a: Arc<dyn PortService> = server;
        let b: Arc<dyn PortService> = client;
        connect_ports(
            "svc",
            &[&a, &b],
            &[(
                "client0.port.calc.required.Calculator.one",
                "server0.port.calc.provided.Calculator.two",
            )],
        )
        .expect("connect");
        assert_eq!(calc.get().map(|c| c.add(0)), Some(2));
    }

    #[test]
    fn test_missing_provider_fails_and_rolls_back() {
        let broker = ObjectBroker::new();
        let server = attached("server0", "calc", &broker);
        let client = attached("client0", "calc", &broker);
        let calc = ServiceConsumer::<Calculator>::new();
        client
            .register_consumer("adder", "Calculator", &calc)
            .expect("consumer");

        let a: Arc<dyn PortService> = server;
        let b: Arc<dyn PortService> = client;
        let res = connect_ports("svc", &[&a, &b], &[]);
        assert!(matches!(res, Err(RtcError::BadParameter(_))));
        assert!(a.get_connector_profiles().is_empty());
        assert!(b.get_connector_profiles().is_empty());
    }

    #[test]
    fn test_release_deactivates_servants() {
        let broker = ObjectBroker::new();
        let server = attached("server0", "calc", &broker);
        let peer = attached("peer0", "calc", &broker);
        server
            .register_provider("adder", "Calculator", Arc::new(Calculator { offset: 0 }))
            .expect("provider");
        let a: Arc<dyn PortService> = server.clone();
        let b: Arc<dyn PortService> = peer;
        connect_ports("svc", &[&a, &b], &[]).expect("connect");
        assert_eq!(broker.servant_count(), 1);
        a.shutdown();
        assert_eq!(broker.servant_count(), 0);
    }

    #[test]
    fn test_dotted_names_rejected() {
        let port = ServicePort::new("calc");
        let res = port.register_provider("a.b", "Calculator", Arc::new(Calculator { offset: 0 }));
        assert!(matches!(res, Err(RtcError::BadParameter(_))));
    }
}

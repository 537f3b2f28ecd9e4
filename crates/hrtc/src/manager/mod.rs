// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Component manager: configuration, factories, component registry, naming.
//!
//! A [`Manager`] is an explicit runtime value. The usual sequence is:
//!
//! ```ignore
//! let mgr = Manager::init(std::env::args())?;
//! mgr.set_module_init_proc(|m| m.register_factory(profile, ctor, None));
//! mgr.activate_manager()?;
//! mgr.run_manager(true)?;   // returns after terminate()
//! mgr.shutdown();
//! ```

pub mod config;
pub mod factory;
pub mod module;
pub mod naming;
pub mod options;
pub mod timer;

pub use config::{load_configuration, CONFIG_ENV, CONFIG_SEARCH_PATH, DEFAULT_CONFIG};
pub use factory::{
    ComponentCtor, ComponentDtor, ComponentFactory, ComponentSpec, EcCtor, EcDtor, EcFactoryTable,
};
pub use module::{LoadedModule, ModuleInitFn, ModuleManager};
pub use naming::{format_name, LocalNaming, NamingBase, NamingManager};
pub use options::ManagerOptions;
pub use timer::{Timer, TimerId};

use crate::broker::ObjectBroker;
use crate::ec::{ExecutionContext, PERIODIC_EC};
use crate::error::{RtcError, RtcResult};
use crate::logging::{self, LogLevel};
use crate::properties::{split_csv, to_bool, Properties};
use crate::rtc::RtObject;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

type InitProc = Box<dyn FnOnce(&Manager) -> RtcResult<()> + Send>;

struct ManagedComponent {
    comp: Arc<RtObject>,
    factory: Arc<ComponentFactory>,
    ec: Option<(String, Arc<dyn ExecutionContext>)>,
}

pub struct Manager {
    this: Weak<Manager>,
    config: Properties,
    broker: Arc<ObjectBroker>,
    factories: RwLock<Vec<Arc<ComponentFactory>>>,
    ec_factories: EcFactoryTable,
    components: Mutex<Vec<ManagedComponent>>,
    modules: ModuleManager,
    naming: NamingManager,
    timer: Option<Timer>,
    runner: Mutex<Option<JoinHandle<()>>>,
    init_proc: Mutex<Option<InitProc>>,
    logger_installed: bool,
    shutting_down: AtomicBool,
    shutdown_done: Mutex<bool>,
}

fn seconds(value: &str, default: f64) -> Duration {
    let secs = value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(default);
    Duration::from_secs_f64(secs)
}

fn init_logger_from(config: &Properties) -> bool {
    if !to_bool(config.get_property("logger.enable"), true) {
        return false;
    }
    let output = match logging::output_for(config.get_property("logger.file_name")) {
        Ok(out) => out,
        Err(e) => {
            eprintln!(
                "hrtc: cannot open log file {}: {}",
                config.get_property("logger.file_name"),
                e
            );
            match logging::output_for("stderr") {
                Ok(out) => out,
                Err(_) => return false,
            }
        }
    };
    let level = LogLevel::parse(config.get_property("logger.log_level")).unwrap_or(LogLevel::Info);
    logging::init_logger(
        vec![output],
        level,
        config.get_property("logger.date_format"),
        config.get_property("manager.name"),
    );
    true
}

impl Manager {
    /// Parse `argv`, build the configuration and bring up the logger, the
    /// broker, naming, the execution context factories and the timer.
    pub fn init<I, T>(argv: I) -> RtcResult<Arc<Self>>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let options = ManagerOptions::parse_args(argv)?;
        let config = load_configuration(&options)?;
        Self::with_config(config)
    }

    /// Same as [`init`](Self::init) from an already merged configuration.
    pub fn with_config(config: Properties) -> RtcResult<Arc<Self>> {
        let logger_installed = init_logger_from(&config);

        let timer = if to_bool(config.get_property("timer.enable"), true) {
            let timer = Timer::new(seconds(config.get_property("timer.tick"), 0.1))?;
            timer.start()?;
            Some(timer)
        } else {
            None
        };

        let naming = NamingManager::new(config.clone());
        let naming_enabled = to_bool(config.get_property("naming.enable"), true);
        if naming_enabled {
            naming.init_services();
        }

        let mgr = Arc::new_cyclic(|this| Self {
            this: this.clone(),
            broker: ObjectBroker::new(),
            factories: RwLock::new(Vec::new()),
            ec_factories: EcFactoryTable::with_builtins(),
            components: Mutex::new(Vec::new()),
            modules: ModuleManager::new(&config),
            naming,
            timer,
            runner: Mutex::new(None),
            init_proc: Mutex::new(None),
            logger_installed,
            shutting_down: AtomicBool::new(false),
            shutdown_done: Mutex::new(false),
            config,
        });

        if naming_enabled && to_bool(mgr.config.get_property("naming.update.enable"), true) {
            if let Some(timer) = &mgr.timer {
                let weak = Arc::downgrade(&mgr);
                timer.register(
                    seconds(mgr.config.get_property("naming.update.interval"), 10.0),
                    move || {
                        if let Some(m) = weak.upgrade() {
                            m.naming.update();
                        }
                    },
                )?;
            }
        }

        log::info!(
            "[Manager::init] {} (pid {}) initialized",
            mgr.config.get_property("manager.instance_name"),
            mgr.config.get_property("manager.pid")
        );
        Ok(mgr)
    }

    pub fn config(&self) -> &Properties {
        &self.config
    }

    pub fn broker(&self) -> &Arc<ObjectBroker> {
        &self.broker
    }

    pub fn naming(&self) -> &NamingManager {
        &self.naming
    }

    pub fn timer(&self) -> Option<&Timer> {
        self.timer.as_ref()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Hook run by [`activate_manager`](Self::activate_manager), typically
    /// registering factories.
    pub fn set_module_init_proc<F>(&self, proc_: F)
    where
        F: FnOnce(&Manager) -> RtcResult<()> + Send + 'static,
    {
        *self.init_proc.lock() = Some(Box::new(proc_));
    }

    /// Activate the broker, preload modules, run the init hook and create
    /// the components of `manager.components.precreate`.
    pub fn activate_manager(&self) -> RtcResult<()> {
        self.broker.activate()?;

        for module in split_csv(self.config.get_property("manager.modules.preload")) {
            if let Err(e) = self.load(&module, "") {
                log::error!("[Manager::activate_manager] preload {}: {}", module, e);
            }
        }

        let init = self.init_proc.lock().take();
        if let Some(init) = init {
            init(self)?;
        }

        for spec in split_csv(self.config.get_property("manager.components.precreate")) {
            if let Err(e) = self.create_component(&spec) {
                log::error!("[Manager::activate_manager] precreate {}: {}", spec, e);
            }
        }
        log::debug!("[Manager::activate_manager] active");
        Ok(())
    }

    /// Enter the broker loop. Blocking mode returns after
    /// [`terminate`](Self::terminate) or [`shutdown`](Self::shutdown);
    /// otherwise the loop runs on a background thread.
    pub fn run_manager(&self, blocking: bool) -> RtcResult<()> {
        if blocking {
            return self.broker.run();
        }
        let broker = self.broker.clone();
        let handle = std::thread::Builder::new()
            .name("rtc-manager".to_string())
            .spawn(move || {
                if let Err(e) = broker.run() {
                    log::error!("[Manager::run_manager] {}", e);
                }
            })
            .map_err(|e| RtcError::OutOfResources(format!("cannot spawn manager runner: {}", e)))?;
        *self.runner.lock() = Some(handle);
        Ok(())
    }

    /// Shut the manager down from a separate thread. Safe to call from
    /// component callbacks.
    pub fn terminate(&self) {
        let Some(mgr) = self.this.upgrade() else {
            return;
        };
        let spawned = std::thread::Builder::new()
            .name("rtc-terminator".to_string())
            .spawn(move || mgr.shutdown());
        if let Err(e) = spawned {
            log::error!("[Manager::terminate] {}", e);
            self.broker.shutdown();
        }
    }

    /// Finalize every component, unbind names, stop the broker and wait for
    /// the runner. Concurrent callers wait for the first to finish.
    pub fn shutdown(&self) {
        let mut done = self.shutdown_done.lock();
        if *done {
            return;
        }
        self.shutting_down.store(true, Ordering::Release);
        log::info!("[Manager::shutdown] shutting down");

        if let Some(timer) = &self.timer {
            timer.stop();
        }

        let names: Vec<String> = self
            .components
            .lock()
            .iter()
            .rev()
            .map(|m| m.comp.instance_name())
            .collect();
        for name in names {
            if let Err(e) = self.delete_component(&name) {
                log::warn!("[Manager::shutdown] delete {}: {}", name, e);
            }
        }

        self.naming.unbind_all();
        self.modules.unload_all();
        self.broker.shutdown();

        let runner = self.runner.lock().take();
        if let Some(handle) = runner {
            if handle.thread().id() != std::thread::current().id() && handle.join().is_err() {
                log::error!("[Manager::shutdown] runner panicked");
            }
        }

        log::info!("[Manager::shutdown] done");
        if self.logger_installed {
            if let Err(e) = logging::close_logger() {
                eprintln!("hrtc: closing logger: {}", e);
            }
        }
        *done = true;
    }

    // --- modules -----------------------------------------------------------

    /// Make a statically linked module loadable by name.
    pub fn register_module(
        &self,
        name: &str,
        init_func: &str,
        init: ModuleInitFn,
    ) -> RtcResult<()> {
        self.modules.register_module(name, init_func, init)
    }

    /// Load a module and run its init function.
    pub fn load(&self, module_path: &str, init_func: &str) -> RtcResult<()> {
        let (module, init) = self.modules.load(module_path, init_func)?;
        if let Some(init) = init {
            if let Err(e) = init(self) {
                log::error!("[Manager::load] {}::{} failed: {}", module.name, module.init_func, e);
                let _ = self.modules.unload(&module.name);
                return Err(e);
            }
        }
        log::info!("[Manager::load] {} loaded", module.name);
        Ok(())
    }

    pub fn unload(&self, module_path: &str) -> RtcResult<()> {
        self.modules.unload(module_path)
    }

    pub fn get_loaded_modules(&self) -> Vec<LoadedModule> {
        self.modules.get_loaded_modules()
    }

    pub fn get_loadable_modules(&self) -> Vec<String> {
        self.modules.get_loadable_modules()
    }

    // --- factories ---------------------------------------------------------

    /// Register a component factory. `profile` must carry `type_name`.
    pub fn register_factory(
        &self,
        profile: Properties,
        ctor: ComponentCtor,
        dtor: Option<ComponentDtor>,
    ) -> RtcResult<()> {
        let factory = ComponentFactory::new(profile, ctor, dtor)?;
        let mut factories = self.factories.write();
        if factories.iter().any(|f| f.type_name() == factory.type_name()) {
            return Err(RtcError::precondition(format!(
                "factory {} already registered",
                factory.type_name()
            )));
        }
        log::debug!("[Manager::register_factory] {}", factory.type_name());
        factories.push(Arc::new(factory));
        Ok(())
    }

    /// Remove a factory without live instances.
    pub fn unregister_factory(&self, type_name: &str) -> RtcResult<()> {
        let mut factories = self.factories.write();
        let pos = factories
            .iter()
            .position(|f| f.type_name() == type_name)
            .ok_or_else(|| RtcError::NotFound(format!("factory {}", type_name)))?;
        if factories[pos].instance_count() > 0 {
            return Err(RtcError::precondition(format!("{} has live instances", type_name)));
        }
        factories.remove(pos);
        Ok(())
    }

    pub fn get_factory_profiles(&self) -> Vec<Properties> {
        self.factories.read().iter().map(|f| f.profile().clone()).collect()
    }

    pub fn register_ec_factory(
        &self,
        name: &str,
        ctor: EcCtor,
        dtor: Option<EcDtor>,
    ) -> RtcResult<()> {
        self.ec_factories.register(name, ctor, dtor)
    }

    pub fn get_ec_factories(&self) -> Vec<String> {
        self.ec_factories.names()
    }

    // --- components --------------------------------------------------------

    /// Create, configure, initialize and start a component from a spec
    /// string such as `Echo?instance_name=echo0`.
    pub fn create_component(&self, spec: &str) -> RtcResult<Arc<RtObject>> {
        if self.is_shutting_down() {
            return Err(RtcError::precondition("manager is shutting down"));
        }
        let spec = ComponentSpec::parse(spec)?;
        let factory = self
            .factories
            .read()
            .iter()
            .find(|f| f.matches(&spec))
            .cloned()
            .ok_or_else(|| RtcError::NotFound(format!("factory for {}", spec.implementation_id)))?;

        let comp = factory.create(self.broker.clone())?;

        if let Err(e) = self.configure_component(&comp, &spec.params) {
            factory.destroy(&comp);
            return Err(e);
        }

        if let Err(e) = comp.initialize() {
            log::error!("[Manager::create_component] {} initialize: {}", comp.instance_name(), e);
            factory.destroy(&comp);
            return Err(e);
        }

        let ec = match self.start_context(&comp) {
            Ok(ec) => ec,
            Err(e) => {
                log::error!("[Manager::create_component] {} context: {}", comp.instance_name(), e);
                if let Err(x) = comp.exit() {
                    log::debug!("[Manager::create_component] exit: {}", x);
                }
                factory.destroy(&comp);
                return Err(e);
            }
        };

        {
            let mut components = self.components.lock();
            if components.iter().any(|m| m.comp.instance_name() == comp.instance_name()) {
                drop(components);
                let name = comp.instance_name();
                if let Err(x) = comp.exit() {
                    log::debug!("[Manager::create_component] exit: {}", x);
                }
                self.ec_factories.destroy(&ec.0, &ec.1);
                factory.destroy(&comp);
                return Err(RtcError::bad_param(format!("instance name {} already in use", name)));
            }
            components.push(ManagedComponent {
                comp: comp.clone(),
                factory,
                ec: Some(ec),
            });
        }

        let names = self.naming.bind_component(&comp);
        log::info!(
            "[Manager::create_component] {} created ({})",
            comp.instance_name(),
            names.join(", ")
        );
        Ok(comp)
    }

    /// Merge component configuration: manager `exec_cxt.*` defaults, the
    /// type and instance config files, then spec parameters.
    fn configure_component(&self, comp: &Arc<RtObject>, params: &Properties) -> RtcResult<()> {
        let category = comp.category();
        let type_name = comp.type_name();
        let mut merged = Properties::new();

        if let Some(exec_cxt) = self.config.find_node("exec_cxt") {
            let profile = comp.properties();
            for key in exec_cxt.property_names() {
                let full = format!("exec_cxt.{}", key);
                if profile.get_property(&full).is_empty() {
                    merged.set_property(&full, exec_cxt.get_property(&key));
                }
            }
        }

        self.merge_config_file(&mut merged, &format!("{}.{}.config_file", category, type_name));

        let instance_name = match params.get_property("instance_name") {
            "" => comp.instance_name(),
            name => name.to_string(),
        };
        self.merge_config_file(&mut merged, &format!("{}.{}.config_file", category, instance_name));

        merged.merge(params);
        merged.set_property("instance_name", &instance_name);
        comp.apply_properties(&merged);
        comp.set_instance_name(&instance_name);

        if self
            .components
            .lock()
            .iter()
            .any(|m| m.comp.instance_name() == instance_name)
        {
            return Err(RtcError::bad_param(format!(
                "instance name {} already in use",
                instance_name
            )));
        }
        Ok(())
    }

    fn merge_config_file(&self, into: &mut Properties, key: &str) {
        let path = self.config.get_property(key);
        if path.is_empty() {
            return;
        }
        match std::fs::read_to_string(path) {
            Ok(text) => {
                into.merge(&Properties::parse(&text));
                log::debug!("[Manager] {} merged from {}", key, path);
            }
            Err(e) => log::warn!("[Manager] cannot read {} ({}): {}", path, key, e),
        }
    }

    /// Create the component's context from `exec_cxt.periodic.*`, bind the
    /// component to it and start it.
    fn start_context(
        &self,
        comp: &Arc<RtObject>,
    ) -> RtcResult<(String, Arc<dyn ExecutionContext>)> {
        let props = comp.properties();
        let kind = props.get_property_or("exec_cxt.periodic.type", PERIODIC_EC);
        let ec_props = Properties::from_pairs(&[
            ("rate", props.get_property("exec_cxt.periodic.rate")),
            ("sync_transition", props.get_property("exec_cxt.sync_transition")),
            ("transition_timeout", props.get_property("exec_cxt.transition_timeout")),
        ]);
        let ec = self.ec_factories.create(&kind, &ec_props)?;
        if let Err(e) = ec.bind_component(comp) {
            self.ec_factories.destroy(&kind, &ec);
            return Err(e);
        }
        if let Err(e) = ec.start() {
            let _ = ec.remove_component(comp);
            self.ec_factories.destroy(&kind, &ec);
            return Err(e);
        }
        Ok((kind, ec))
    }

    /// Exit and destroy a component.
    pub fn delete_component(&self, instance_name: &str) -> RtcResult<()> {
        let managed = {
            let mut components = self.components.lock();
            let pos = components
                .iter()
                .position(|m| m.comp.instance_name() == instance_name)
                .ok_or_else(|| RtcError::NotFound(format!("component {}", instance_name)))?;
            components.remove(pos)
        };

        self.naming.unbind_component(&managed.comp);
        if let Err(e) = managed.comp.exit() {
            log::warn!("[Manager::delete_component] {} exit: {}", instance_name, e);
        }
        if let Some((kind, ec)) = &managed.ec {
            self.ec_factories.destroy(kind, ec);
        }
        managed.factory.destroy(&managed.comp);
        log::info!("[Manager::delete_component] {} deleted", instance_name);

        let empty = self.components.lock().is_empty();
        if empty
            && !self.is_shutting_down()
            && to_bool(self.config.get_property("manager.shutdown_on_nortcs"), false)
        {
            log::info!("[Manager::delete_component] no components left, terminating");
            self.terminate();
        }
        Ok(())
    }

    pub fn get_component(&self, instance_name: &str) -> Option<Arc<RtObject>> {
        self.components
            .lock()
            .iter()
            .find(|m| m.comp.instance_name() == instance_name)
            .map(|m| m.comp.clone())
    }

    pub fn get_components(&self) -> Vec<Arc<RtObject>> {
        self.components.lock().iter().map(|m| m.comp.clone()).collect()
    }

    /// The context the manager created for `instance_name`.
    pub fn get_component_context(&self, instance_name: &str) -> Option<Arc<dyn ExecutionContext>> {
        self.components
            .lock()
            .iter()
            .find(|m| m.comp.instance_name() == instance_name)
            .and_then(|m| m.ec.as_ref().map(|(_, ec)| ec.clone()))
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtc::{ComponentBehavior, LifeCycleState, NoBehavior};
    use std::sync::atomic::AtomicUsize;

    fn manager(extra: &[&str]) -> Arc<Manager> {
        let mut argv = vec!["rtcd", "-d", "-o", "logger.enable:NO", "-o", "timer.enable:NO"];
        argv.extend_from_slice(extra);
        Manager::init(argv).expect("init")
    }

    fn echo_profile() -> Properties {
        Properties::from_pairs(&[
            ("type_name", "Echo"),
            ("category", "example"),
            ("vendor", "acme"),
            ("version", "1.0"),
        ])
    }

    fn no_behavior() -> ComponentCtor {
        Arc::new(|_: &Arc<RtObject>| Ok(Box::new(NoBehavior) as Box<dyn ComponentBehavior>))
    }

    #[test]
    fn test_create_and_delete_round_trip() {
        let mgr = manager(&[]);
        mgr.activate_manager().expect("activate");
        let before = mgr.get_components().len();
        mgr.register_factory(echo_profile(), no_behavior(), None)
            .expect("register");

        let comp = mgr.create_component("Echo").expect("create");
        assert_eq!(comp.instance_name(), "Echo0");
        assert!(mgr.get_component("Echo0").is_some());
        let ec = mgr.get_component_context("Echo0").expect("ec");
        assert!(ec.is_running());
        assert_eq!(ec.get_component_state(&comp), LifeCycleState::Inactive);
        let names = mgr.naming().bound_names();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".host_cxt/Echo0.rtc"));

        mgr.delete_component("Echo0").expect("delete");
        assert_eq!(mgr.get_components().len(), before);
        assert!(comp.is_finalized());
        assert!(!ec.is_running());
        assert!(mgr.naming().bound_names().is_empty());
        mgr.shutdown();
    }

    #[test]
    fn test_instance_name_and_rate_from_spec() {
        let mgr = manager(&["-o", "naming.formats:%n.rtc"]);
        mgr.activate_manager().expect("activate");
        mgr.register_factory(echo_profile(), no_behavior(), None)
            .expect("register");
        let comp = mgr
            .create_component(
                "RTC:acme:example:Echo:Rust:1.0?instance_name=echo&exec_cxt.periodic.rate=20",
            )
            .expect("create");
        assert_eq!(comp.instance_name(), "echo");
        assert!(mgr.naming().resolve("echo.rtc").is_some());
        let ec = mgr.get_component_context("echo").expect("ec");
        assert_eq!(ec.get_rate(), 20.0);

        assert!(matches!(
            mgr.create_component("Echo?instance_name=echo"),
            Err(RtcError::BadParameter(_))
        ));
        assert_eq!(mgr.get_components().len(), 1);
        mgr.shutdown();
        assert!(comp.is_finalized());
    }

    #[test]
    fn test_initialize_failure_calls_dtor() {
        struct Failing;
        impl ComponentBehavior for Failing {
            fn on_initialize(&mut self) -> RtcResult<()> {
                Err(RtcError::Error)
            }
        }
        let mgr = manager(&[]);
        mgr.activate_manager().expect("activate");
        let destroyed = Arc::new(AtomicUsize::new(0));
        let d = destroyed.clone();
        mgr.register_factory(
            echo_profile(),
            Arc::new(|_: &Arc<RtObject>| Ok(Box::new(Failing) as Box<dyn ComponentBehavior>)),
            Some(Arc::new(move |_: &Arc<RtObject>| {
                d.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("register");

        assert!(mgr.create_component("Echo").is_err());
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert!(mgr.get_components().is_empty());
    }

    #[test]
    fn test_unknown_factory_and_duplicate_registration() {
        let mgr = manager(&[]);
        mgr.activate_manager().expect("activate");
        assert!(matches!(mgr.create_component("Echo"), Err(RtcError::NotFound(_))));
        mgr.register_factory(echo_profile(), no_behavior(), None)
            .expect("register");
        assert!(mgr.register_factory(echo_profile(), no_behavior(), None).is_err());
        assert!(mgr.delete_component("missing").is_err());
    }

    #[test]
    fn test_module_load_runs_init() {
        let mgr = manager(&["-l", "Echo"]);
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        mgr.register_module(
            "Echo",
            "EchoInit",
            Arc::new(move |m: &Manager| {
                c.fetch_add(1, Ordering::SeqCst);
                m.register_factory(echo_profile(), no_behavior(), None)
            }),
        )
        .expect("register module");
        mgr.activate_manager().expect("activate");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.get_loaded_modules().len(), 1);
        assert_eq!(mgr.get_factory_profiles().len(), 1);
        mgr.unload("Echo").expect("unload");
        assert!(mgr.get_loaded_modules().is_empty());
    }

    #[test]
    fn test_shutdown_on_nortcs_stops_runner() {
        let mgr = manager(&["-o", "manager.shutdown_on_nortcs:YES"]);
        mgr.set_module_init_proc(|m| m.register_factory(echo_profile(), no_behavior(), None));
        mgr.activate_manager().expect("activate");
        mgr.run_manager(false).expect("run");
        mgr.create_component("Echo").expect("create");
        mgr.delete_component("Echo0").expect("delete");
        assert!(mgr.broker().wait_shutdown(Duration::from_secs(2)));
    }
}

//! End-to-end inflation of the stopwatch fixture
//!
//! Loads the template through a `TemplateCache`, builds the host from the
//! TOML type schema and checks the resulting object graph.

use std::path::PathBuf;

use markup_inflator::host::memory::MemoryTypeSystem;
use markup_inflator::host::schema::TypeSchema;
use markup_inflator::host::{HandlerKind, HostTypeSystem, ObjectId, Value};
use markup_inflator::template::DirectoryResources;
use markup_inflator::{InflatorConfig, ReactiveInflator, TemplateCache};
use pretty_assertions::assert_eq;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn host_system() -> (MemoryTypeSystem, ObjectId) {
    let schema =
        TypeSchema::from_file(&fixtures().join("hello-types.toml")).expect("Should load schema");
    let mut system = schema.build().expect("Should build host");
    let host = system.instantiate("Stopwatch").expect("Should create host");
    (system, host)
}

#[test]
fn test_outline_of_fixture() {
    let cache = TemplateCache::new(DirectoryResources::new(fixtures()));
    let template = cache.get_or_load("hello-window.xml").expect("Should load template");

    assert_eq!(template.resource(), Some("hello-window.xml"));
    insta::assert_snapshot!(template.outline(), @r###"
    Stopwatch title="Hello"
      Box #box orientation="vertical" spacing="6"
        Label #time _if={timer-visible} label="Elapsed: {elapsed}"
        Button #reset label="Reset" expand="true" on-clicked=on_reset
        Button _pack.padding="4" label="Close" on-clicked=emit closed
    "###);
}

#[test]
fn test_inflated_tree() {
    let cache = TemplateCache::new(DirectoryResources::new(fixtures()));
    let template = cache.get_or_load("hello-window.xml").expect("Should load template");
    let inflator = template.create_inflator(InflatorConfig::default().builtin_registry());

    let (mut system, host) = host_system();
    let inflation = inflator.inflate(&mut system, host).expect("Should inflate");

    assert!(inflation.is_clean());
    assert_eq!(inflation.created, 4);
    assert_eq!(
        inflation.named.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["box", "time", "reset"]
    );
    assert_eq!(
        system.describe(host).expect("Should describe"),
        "Stopwatch#0 visible=true elapsed=\"00:00\" timer-visible=true title=\"Hello\"\n\
         \x20 Box#1 visible=true orientation=\"vertical\" spacing=6\n\
         \x20   Label#2 visible=true label=\"Elapsed: 00:00\"\n\
         \x20   Button#3 visible=true label=\"Reset\" [expand=true] on-clicked->on_reset\n\
         \x20   Button#4 visible=true label=\"Close\" [padding=4] on-clicked->emit closed\n"
    );
}

#[test]
fn test_hidden_timer_skips_label() {
    let cache = TemplateCache::new(DirectoryResources::new(fixtures()));
    let template = cache.get_or_load("hello-window.xml").expect("Should load template");
    let inflator = template.create_inflator(InflatorConfig::default().builtin_registry());

    let (mut system, host) = host_system();
    system
        .set_property(host, "timer-visible", Value::Bool(false))
        .expect("Should set property");
    let inflation = inflator.inflate(&mut system, host).expect("Should inflate");

    assert_eq!(inflation.created, 3);
    assert_eq!(inflation.get("time"), None);
    let boxed = inflation.get("box").expect("Should declare box");
    assert_eq!(system.children(boxed).expect("Should list children").len(), 2);
}

#[test]
fn test_signals_reach_host() {
    let cache = TemplateCache::new(DirectoryResources::new(fixtures()));
    let template = cache.get_or_load("hello-window.xml").expect("Should load template");
    let inflator = template.create_inflator(InflatorConfig::default().builtin_registry());

    let (mut system, host) = host_system();
    let inflation = inflator.inflate(&mut system, host).expect("Should inflate");

    let reset = inflation.get("reset").expect("Should declare reset");
    let fired = system.emit(reset, "clicked", Vec::new()).expect("Should emit");
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].target, host);
    assert_eq!(fired[0].kind, HandlerKind::Method("on_reset".to_string()));

    let boxed = inflation.get("box").expect("Should declare box");
    let close = system.children(boxed).expect("Should list children")[2];
    let fired = system.emit(close, "clicked", Vec::new()).expect("Should emit");
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].kind, HandlerKind::Emit("closed".to_string()));
    assert_eq!(system.invocations().len(), 2);
}

#[test]
fn test_reactive_timer_label() {
    let cache = TemplateCache::new(DirectoryResources::new(fixtures()));
    let template = cache.get_or_load("hello-window.xml").expect("Should load template");
    let (mut system, host) = host_system();
    let mut reactive = ReactiveInflator::new(
        template.create_inflator(InflatorConfig::default().builtin_registry()),
        host,
    );

    let inflation = reactive.inflate(&mut system).expect("Should inflate");
    let boxed = inflation.get("box").expect("Should declare box");
    let buttons = system.children(boxed).expect("Should list children")[1..].to_vec();

    system
        .set_property(host, "timer-visible", Value::Bool(false))
        .expect("Should set property");
    let inflation = reactive.inflate(&mut system).expect("Should update");
    assert_eq!((inflation.created, inflation.removed), (0, 1));
    assert_eq!(system.children(boxed).expect("Should list children"), &buttons[..]);

    system
        .set_property(host, "timer-visible", Value::Bool(true))
        .expect("Should set property");
    system
        .set_property(host, "elapsed", Value::String("00:05".to_string()))
        .expect("Should set property");
    let inflation = reactive.inflate(&mut system).expect("Should update");
    let time = inflation.get("time").expect("Should declare time");
    assert_eq!(inflation.created, 1);
    assert_eq!(
        system.children(boxed).expect("Should list children"),
        &[time, buttons[0], buttons[1]]
    );
    assert_eq!(
        system.get_property(time, "label").expect("Should read"),
        Value::String("Elapsed: 00:05".to_string())
    );

    // Handlers were connected once, by the first pass
    let fired = system.emit(buttons[0], "clicked", Vec::new()).expect("Should emit");
    assert_eq!(fired.len(), 1);
}

use insta::assert_snapshot;
use scenebridge::bridge::dispatch::CATALOGUE;
use scenebridge::bridge::{Command, CommandDispatcher, ErrorKind};
use scenebridge::host::Host;
use scenebridge::host::layout::Layout;
use scenebridge::host::scene::Scene;
use serde_json::{Value, json};

fn host() -> Host {
    Host::new(Scene::startup(), Layout::with_viewport(160, 120))
}

fn send(dispatcher: &CommandDispatcher, host: &mut Host, name: &str, params: Value) -> Value {
    let response = dispatcher.dispatch(host, Command::with_params(name, params));
    assert!(response.is_success(), "{name} failed: {:?}", response.message);
    response.result.unwrap()
}

#[test]
fn test_catalogue_names() {
    let names: Vec<&str> = CATALOGUE.iter().map(|spec| spec.name).collect();
    assert_snapshot!(names.join("\n"), @r"
    ping
    help
    get_scene_info
    get_object_info
    create_object
    modify_object
    delete_object
    select_objects
    execute_code
    get_viewport_screenshot
    render_image
    get_modifiers
    add_modifier
    remove_modifier
    apply_modifier
    get_asset_libraries
    list_assets
    append_asset
    ");
}

#[test]
fn test_session_edits_scene_in_order() {
    let dispatcher = CommandDispatcher::default();
    let mut host = host();

    send(&dispatcher, &mut host, "create_object", json!({"type": "cube", "name": "Box"}));
    send(
        &dispatcher,
        &mut host,
        "modify_object",
        json!({"name": "Box", "location": [0, 0, 3], "visible": false}),
    );
    send(
        &dispatcher,
        &mut host,
        "add_modifier",
        json!({"object_name": "Box", "modifier_type": "SUBSURF", "properties": {"levels": 2}}),
    );
    send(&dispatcher, &mut host, "select_objects", json!({"names": ["Box", "Light"]}));

    let info = send(&dispatcher, &mut host, "get_object_info", json!({"name": "Box"}));
    assert_eq!(info["location"], json!([0.0, 0.0, 3.0]));
    assert_eq!(info["visible"], json!(false));
    assert_eq!(info["modifiers"], json!(["Subdivision"]));

    let scene = send(&dispatcher, &mut host, "get_scene_info", json!({}));
    assert_eq!(scene["object_count"], 4);
    assert_eq!(scene["selected"], json!(["Box", "Light"]));
    assert_eq!(scene["active"], "Box");
}

#[test]
fn test_script_changes_are_visible_to_later_commands() {
    let dispatcher = CommandDispatcher::default();
    let mut host = host();

    send(
        &dispatcher,
        &mut host,
        "execute_code",
        json!({"code": "scene.create('empty', 'Pivot')\nscene.set_location('Pivot', 1, 2, 3)"}),
    );

    let info = send(&dispatcher, &mut host, "get_object_info", json!({"name": "Pivot"}));
    assert_eq!(info["type"], "EMPTY");
    assert_eq!(info["location"], json!([1.0, 2.0, 3.0]));
}

#[test]
fn test_error_kinds_reach_the_wire() {
    let dispatcher = CommandDispatcher::default();
    let mut host = host();

    let cases = [
        ("teleport", json!({}), ErrorKind::UnknownCommand),
        ("get_object_info", json!({}), ErrorKind::InvalidParams),
        ("get_object_info", json!({"name": "Nope"}), ErrorKind::NotFound),
        ("create_object", json!({"type": "blob"}), ErrorKind::InvalidType),
        ("add_modifier", json!({"object_name": "Light", "modifier_type": "BEVEL"}), ErrorKind::InvalidType),
        ("execute_code", json!({"code": "error('boom')"}), ErrorKind::ExecutionError),
        ("list_assets", json!({"library_name": "missing"}), ErrorKind::NotFound),
    ];

    for (name, params, kind) in cases {
        let response = dispatcher.dispatch(&mut host, Command::with_params(name, params));
        assert_eq!(response.kind, Some(kind), "{name}: {:?}", response.message);
    }

    // Nothing above disturbed the scene
    assert_eq!(host.scene.len(), 3);
}

#[test]
fn test_render_without_camera_is_a_render_error() {
    let dispatcher = CommandDispatcher::default();
    let mut host = host();
    send(&dispatcher, &mut host, "delete_object", json!({"name": "Camera"}));

    let response = dispatcher.dispatch(&mut host, Command::new("render_image"));
    assert_eq!(response.kind, Some(ErrorKind::RenderError));
}

#[test]
fn test_script_cannot_exit_the_host() {
    let dispatcher = CommandDispatcher::default();
    let mut host = host();

    let response = dispatcher.dispatch(
        &mut host,
        Command::with_params("execute_code", json!({"code": "os.exit(7)"})),
    );
    assert_eq!(response.kind, Some(ErrorKind::ExecutionError));
    assert!(response.message.unwrap().contains("os.exit is not available"));

    let pong = send(&dispatcher, &mut host, "ping", json!({}));
    assert_eq!(pong["pong"], true);
}

#[test]
fn test_clearing_selection_clears_active() {
    let dispatcher = CommandDispatcher::default();
    let mut host = host();

    send(&dispatcher, &mut host, "select_objects", json!({"names": ["Cube"]}));
    let cleared = send(&dispatcher, &mut host, "select_objects", json!({"names": []}));
    assert_eq!(cleared, json!({"selected": [], "active": null}));
}

use writenode::core::{PathComputationError, WriteNodeError};
use writenode::host::{Host, Knob};
use writenode::templating::{FieldValue, Fields};
use writenode::test_utils::{HandlerFixture, exr_render_path, init_test_logging};
use writenode::writenode::{PathState, ResolutionMode};

/// Paths are built from the work file's fields and the output name
#[test]
fn test_render_path_from_work_file() {
    init_test_logging(None);
    let fixture = HandlerFixture::saved(3).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    assert_eq!(fixture.cached_path(node), exr_render_path(3, "beauty"));
    assert_eq!(fixture.handler.compute_render_path(node).unwrap(), exr_render_path(3, "beauty"));
    assert_eq!(fixture.path_warning(node), "");
    assert_eq!(fixture.handler.path_state(node, ResolutionMode::Full), PathState::Valid);
}

/// The proxy template gets the proxy dimensions
#[test]
fn test_proxy_path_uses_proxy_dimensions() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    let expected = "/proj/sh010/renders/v001/960x540/sh010_beauty.%04d.exr";
    assert_eq!(fixture.handler.compute_proxy_path(node).unwrap(), expected);
    assert_eq!(fixture.cached_proxy_path(node), expected);
}

/// Without a proxy template the proxy path is the full-resolution path
#[test]
fn test_proxy_path_falls_back_to_render_template() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Dpx Render", None).unwrap();

    let full = fixture.handler.compute_render_path(node).unwrap();
    assert_eq!(fixture.handler.compute_proxy_path(node).unwrap(), full);

    let template = fixture.handler.get_proxy_render_template(node).unwrap();
    assert_eq!(template.name(), "nuke_shot_render_optional");
}

/// Computing twice without a change in between gives the same path
#[test]
fn test_compute_is_idempotent() {
    let fixture = HandlerFixture::saved(2).unwrap();
    let node = fixture.create_node("Exr Render", Some("fg")).unwrap();

    let first = fixture.handler.compute_render_path(node).unwrap();
    let second = fixture.handler.compute_render_path(node).unwrap();
    assert_eq!(first, second);

    let surfaced = fixture.handler.on_compute_path(node, ResolutionMode::Full).unwrap();
    let again = fixture.handler.on_compute_path(node, ResolutionMode::Full).unwrap();
    assert_eq!(surfaced, again);
    assert_eq!(surfaced, first);
}

/// A computed path reads back into the fields it was built from
#[test]
fn test_computed_path_round_trips_through_template() {
    let fixture = HandlerFixture::saved(4).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();
    let template = fixture.handler.get_render_template(node).unwrap();

    let path = fixture.cached_path(node);
    let fields = template.extract_fields(&path).unwrap();
    assert_eq!(fields["Shot"], FieldValue::from("sh010"));
    assert_eq!(fields["version"], FieldValue::Int(4));
    assert_eq!(fields["output"], FieldValue::from("beauty"));
    assert_eq!(template.apply_fields(&fields).unwrap(), path);

    let mut frame: Fields = Fields::new();
    frame.insert("Shot".to_string(), "sh020".into());
    frame.insert("version".to_string(), FieldValue::Int(12));
    frame.insert("output".to_string(), "bg".into());
    frame.insert("SEQ".to_string(), FieldValue::Int(1001));
    let frame_path = template.apply_fields(&frame).unwrap();
    assert_eq!(frame_path, "/proj/sh020/renders/v012/sh020_bg.1001.exr");
    assert_eq!(template.extract_fields(&frame_path).unwrap(), frame);
}

/// An unsaved script has no work-file fields
#[test]
fn test_unsaved_script_is_not_a_work_file() {
    let fixture = HandlerFixture::new().unwrap();

    let err = fixture.handler.create_new_node("Exr Render").unwrap_err();
    assert_eq!(err, WriteNodeError::ScriptNotSaved);

    let node = fixture.host.create_node("Write1");
    fixture.handler.setup_new_node(node).unwrap();

    let err = fixture.handler.compute_render_path(node).unwrap_err();
    assert_eq!(err, WriteNodeError::PathComputation(PathComputationError::NotAWorkFile));
    assert!(err.to_string().contains("not a recognized work file"));

    assert_eq!(fixture.handler.on_compute_path(node, ResolutionMode::Full).as_deref(), Some(""));
    assert_eq!(fixture.cached_path(node), "");
    assert!(fixture.path_warning(node).contains("not a recognized work file"));
    assert_eq!(fixture.handler.path_state(node, ResolutionMode::Full), PathState::Uncached);
}

/// Scripts outside the work area cannot receive new nodes
#[test]
fn test_script_outside_work_area_is_rejected() {
    let fixture = HandlerFixture::new().unwrap();
    fixture.host.set_script_path(Some("/tmp/scratch.nk"));

    let err = fixture.handler.create_new_node("Exr Render").unwrap_err();
    assert!(matches!(err, WriteNodeError::NotAWorkFile { .. }));
}

/// A required output key needs an output name
#[test]
fn test_required_output_name() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    fixture.set_output(node, "");
    let err = fixture.handler.compute_render_path(node).unwrap_err();
    assert!(matches!(
        err,
        WriteNodeError::PathComputation(PathComputationError::OutputNameRequired { .. })
    ));
    // the last good path stays in place
    assert_eq!(fixture.cached_path(node), exr_render_path(1, "beauty"));
    assert!(fixture.path_warning(node).contains("You can still render to the frozen path"));
}

/// An optional output key is left out when no output name is set
#[test]
fn test_optional_output_name() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Dpx Render", None).unwrap();

    assert_eq!(fixture.host.knob_str(node, Knob::OutputName), "");
    assert_eq!(
        fixture.handler.compute_render_path(node).unwrap(),
        "/proj/sh010/renders/v001/sh010.%04d.dpx"
    );

    fixture.set_output(node, "matte");
    assert_eq!(fixture.cached_path(node), "/proj/sh010/renders/v001/sh010_matte.%04d.dpx");
}

/// Illegal output names fail and keep the previous path
#[test]
fn test_illegal_output_name() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    fixture.set_output(node, "bad/name");
    let err = fixture.handler.compute_render_path(node).unwrap_err();
    assert!(matches!(
        err,
        WriteNodeError::PathComputation(PathComputationError::IllegalOutputName { .. })
    ));
    assert!(err.to_string().contains("illegal characters"));

    assert_eq!(fixture.cached_path(node), exr_render_path(1, "beauty"));
    assert_eq!(
        fixture.handler.on_compute_path(node, ResolutionMode::Full).unwrap(),
        exr_render_path(1, "beauty")
    );
    assert!(fixture.path_warning(node).contains("illegal characters"));
    assert_eq!(fixture.handler.path_state(node, ResolutionMode::Full), PathState::ValidWithWarning);
}

/// The surfaced path is split for display and the node is labelled
#[test]
fn test_path_preview_and_label() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    assert_eq!(fixture.host.knob_str(node, Knob::PathContext), "/proj/sh010");
    assert_eq!(fixture.host.knob_str(node, Knob::PathLocal), "renders/v001");
    assert_eq!(fixture.host.knob_str(node, Knob::PathFilename), "sh010_beauty.%04d.exr");
    assert_eq!(fixture.host.knob_str(node, Knob::Label), "Write Exr Render");
}

/// In proxy mode identical proxy and full paths produce a render warning
#[test]
fn test_proxy_collision_warning() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let dpx = fixture.create_node("Dpx Render", None).unwrap();
    let exr = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    fixture.host.set_proxy(true);
    fixture.handler.on_compute_path(dpx, ResolutionMode::Proxy).unwrap();
    fixture.handler.on_compute_path(exr, ResolutionMode::Proxy).unwrap();

    assert!(fixture.host.knob_str(dpx, Knob::RenderWarning).contains("overwrite"));
    assert_eq!(fixture.host.knob_str(exr, Knob::RenderWarning), "");
}

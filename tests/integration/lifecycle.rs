use serde_json::Value;
use std::rc::Rc;
use writenode::core::WriteNodeError;
use writenode::host::{Host, Knob, KnobValue};
use writenode::test_utils::{
    HandlerFixture, PipelineFixture, exr_render_path, fixture_date, work_file,
};
use writenode::writenode::{FixedClock, PathState, ResolutionMode, WriteNodeHandler};

fn list_knob(fixture: &HandlerFixture, node: writenode::host::NodeId, knob: Knob) -> Vec<String> {
    fixture
        .host
        .knob(node, knob)
        .and_then(|v| v.as_list().map(<[String]>::to_vec))
        .unwrap_or_default()
}

/// New nodes get the first free default name and the chosen profile
#[test]
fn test_create_new_node() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let first = fixture.create_node("Exr Render", None).unwrap();
    let second = fixture.create_node("Exr Render", None).unwrap();
    fixture.host.add_other_node("RenderWrite3");
    let fourth = fixture.create_node("Dpx Render", None).unwrap();

    assert_eq!(fixture.host.node_name(first).as_deref(), Some("RenderWrite1"));
    assert_eq!(fixture.host.node_name(second).as_deref(), Some("RenderWrite2"));
    assert_eq!(fixture.host.node_name(fourth).as_deref(), Some("RenderWrite4"));

    assert_eq!(fixture.handler.get_node_profile_name(fourth), "Dpx Render");
    assert_eq!(list_knob(&fixture, first, Knob::ProfileChoices), vec![
        "Exr Render",
        "Dpx Render",
        "Dated Render"
    ]);
    assert!(fixture.handler.is_constructed(first));
    assert_eq!(fixture.handler.get_nodes().len(), 3);
}

/// Unknown profiles are refused
#[test]
fn test_create_node_with_unknown_profile() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let err = fixture.handler.create_new_node("Tiff Render").unwrap_err();
    match err {
        WriteNodeError::ProfileNotFound {
            name,
            available,
        } => {
            assert_eq!(name, "Tiff Render");
            assert_eq!(available.len(), 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(fixture.host.nodes().is_empty());
}

/// A profile naming a missing template cannot be applied
#[test]
fn test_profile_with_missing_template() {
    let fixture = HandlerFixture::with_pipeline(&PipelineFixture::broken_profile()).unwrap();
    fixture.save_as(1);

    let err = fixture.handler.create_new_node("Broken Render").unwrap_err();
    match err {
        WriteNodeError::TemplateNotFound {
            name,
            suggestions,
        } => {
            assert_eq!(name, "nuke_shot_rendr");
            assert!(suggestions.contains(&"nuke_shot_render".to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Output names of new nodes are unique per profile
#[test]
fn test_initial_output_names() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let outputs = |profile: &str| -> Vec<String> {
        (0..3)
            .map(|_| {
                let node = fixture.create_node(profile, None).unwrap();
                fixture.host.knob_str(node, Knob::OutputName)
            })
            .collect()
    };

    assert_eq!(outputs("Exr Render"), vec!["output", "output1", "output2"]);
    // optional output: the first node goes without one
    assert_eq!(outputs("Dpx Render"), vec!["", "output", "output1"]);
    // no output key at all
    assert_eq!(outputs("Dated Render"), vec!["", "", ""]);
}

/// Applying a profile configures the encoder and caches its settings
#[test]
fn test_profile_encoder_settings() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    let encoder = fixture.host.encoder(node).unwrap();
    assert_eq!(encoder.file_type, "exr");
    assert_eq!(encoder.knobs.get("datatype"), Some(&Value::from("16 bit half")));
    assert_eq!(encoder.knobs.get("compression"), Some(&Value::from("Zip (1 scanline)")));

    // "gamma" is not an encoder knob and is not promoted
    assert_eq!(list_knob(&fixture, node, Knob::PromotedKnobs), vec!["compression"]);
    assert_eq!(fixture.host.knob_str(node, Knob::FileType), "exr");
    assert_eq!(
        fixture.host.knob(node, Knob::TileColor).and_then(|v| v.as_int()),
        Some(0x0080_FF00)
    );
    assert_eq!(fixture.host.knob_str(node, Knob::RenderTemplate), "nuke_shot_render");
    assert_eq!(fixture.host.knob_str(node, Knob::PublishTemplate), "nuke_shot_publish");
    assert_eq!(fixture.host.knob_str(node, Knob::ProxyRenderTemplate), "nuke_shot_render_proxy");
    assert_eq!(fixture.host.knob_str(node, Knob::ProxyPublishTemplate), "");

    assert_eq!(
        fixture.handler.get_node_published_file_type(node).as_deref(),
        Some("Rendered Image")
    );
    let proxy_publish = fixture.handler.get_proxy_publish_template(node).unwrap();
    assert_eq!(proxy_publish.name(), "nuke_shot_publish");
}

/// Selecting a profile recomputes the path and updates output knobs
#[test]
fn test_profile_selection() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    fixture.handler.on_profile_selected(node, "Dpx Render").unwrap();
    assert_eq!(fixture.cached_path(node), "/proj/sh010/renders/v001/sh010_beauty.%04d.dpx");
    assert_eq!(fixture.host.encoder(node).unwrap().file_type, "dpx");
    assert_eq!(fixture.host.knob_str(node, Knob::Label), "Write Dpx Render");
    assert!(fixture.host.knob_bool(node, Knob::OutputVisible));

    fixture.handler.on_profile_selected(node, "Dated Render").unwrap();
    assert_eq!(fixture.host.knob_str(node, Knob::OutputName), "");
    assert!(!fixture.host.knob_bool(node, Knob::OutputVisible));
    assert!(fixture.cached_path(node).ends_with("/v001/1920x1080/sh010.%04d.exr"));

    let err = fixture.handler.on_profile_selected(node, "Nope").unwrap_err();
    assert!(matches!(err, WriteNodeError::ProfileNotFound { .. }));
    assert_eq!(fixture.handler.get_node_profile_name(node), "Dated Render");
}

/// Knob edits on nodes that are not set up yet are ignored
#[test]
fn test_callbacks_ignored_before_setup() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.host.create_node("Write9");

    fixture.host.set_knob(node, Knob::OutputName, "beauty".into());
    fixture.handler.on_knob_changed(node, Knob::OutputName);
    fixture.handler.on_profile_selected(node, "Exr Render").unwrap();

    assert_eq!(fixture.cached_path(node), "");
    assert_eq!(fixture.handler.get_node_profile_name(node), "");
    assert!(fixture.handler.on_compute_path(node, ResolutionMode::Full).is_none());
}

/// Saving leaves nodes that are not set up untouched
#[test]
fn test_save_skips_nodes_before_setup() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.host.create_node("Write9");

    fixture.save_and_notify(2);

    assert_eq!(fixture.cached_path(node), "");
    assert_eq!(fixture.host.knob_str(node, Knob::LastKnownScript), "");
    assert_eq!(fixture.host.knob_str(node, Knob::PromotedSettings), "");
    assert!(!fixture.handler.is_constructed(node));
}

/// The node name can drive the output name
#[test]
fn test_use_node_name_as_output() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    fixture.host.set_knob(node, Knob::UseNameAsOutput, true.into());
    fixture.handler.on_knob_changed(node, Knob::UseNameAsOutput);
    assert_eq!(fixture.cached_path(node), exr_render_path(1, "RenderWrite1"));
    assert!(!fixture.host.knob_bool(node, Knob::OutputEnabled));

    fixture.host.rename_node(node, "Hero");
    fixture.handler.on_node_renamed(node);
    assert_eq!(fixture.cached_path(node), exr_render_path(1, "Hero"));

    // typing an output while the toggle is on keeps the node name
    fixture.set_output(node, "ignored");
    assert_eq!(fixture.cached_path(node), exr_render_path(1, "Hero"));
}

/// The disabled flag is mirrored onto the encoder
#[test]
fn test_disable_is_mirrored() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();
    assert!(!fixture.host.encoder(node).unwrap().disabled);

    fixture.host.set_knob(node, Knob::Disable, true.into());
    fixture.handler.on_knob_changed(node, Knob::Disable);
    assert!(fixture.host.encoder(node).unwrap().disabled);
}

/// A node whose profile disappeared keeps its cached path and settings
#[test]
fn test_deleted_profile_keeps_cached_path() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    let config = PipelineFixture::without_exr().parse().unwrap();
    fixture.handler.set_configuration(&config).unwrap();

    assert_eq!(fixture.handler.compute_render_path(node).unwrap(), exr_render_path(1, "beauty"));
    assert_eq!(list_knob(&fixture, node, Knob::ProfileChoices), vec![
        "Exr Render [Not Found]",
        "Dpx Render",
        "Dated Render"
    ]);

    fixture.save_and_notify(2);
    assert_eq!(fixture.cached_path(node), exr_render_path(1, "beauty"));
    assert_eq!(
        fixture.handler.on_compute_path(node, ResolutionMode::Full).unwrap(),
        exr_render_path(1, "beauty")
    );

    let template = fixture.handler.get_render_template(node).unwrap();
    assert_eq!(template.name(), "nuke_shot_render");
}

/// Reloading a node whose profile is gone restores its cached encoder settings
#[test]
fn test_reload_with_deleted_profile_restores_encoder() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();
    fixture.host.set_encoder_file_type(node, "png");

    let config = PipelineFixture::without_exr().parse().unwrap();
    let clock = Rc::new(FixedClock::new(fixture_date()));
    let reloaded = WriteNodeHandler::with_clock(Rc::clone(&fixture.host), &config, clock).unwrap();
    reloaded.on_script_load();

    assert!(reloaded.is_constructed(node));
    assert_eq!(fixture.host.encoder(node).unwrap().file_type, "exr");
    assert_eq!(fixture.handler.get_node_profile_name(node), "Exr Render");
    assert_eq!(
        reloaded.on_compute_path(node, ResolutionMode::Full).as_deref(),
        Some(exr_render_path(1, "beauty").as_str())
    );
}

/// Promoted encoder knobs keep the artist's values across a save and reload
#[test]
fn test_promoted_settings_survive_reload() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    fixture.host.set_encoder_knob(node, "compression", &Value::from("PIZ"));
    fixture.handler.on_script_save(&work_file(1));
    match fixture.host.knob(node, Knob::PromotedSettings) {
        Some(KnobValue::Json(Value::Object(saved))) => {
            assert_eq!(saved.get("compression"), Some(&Value::from("PIZ")));
        }
        other => panic!("unexpected promoted settings: {other:?}"),
    }

    // a fresh encoder comes back with its defaults
    fixture.host.set_encoder_knob(node, "compression", &Value::from("none"));
    let reloaded = WriteNodeHandler::with_clock(
        Rc::clone(&fixture.host),
        &PipelineFixture::standard().parse().unwrap(),
        Rc::new(FixedClock::new(fixture_date())),
    )
    .unwrap();
    reloaded.on_script_load();

    let encoder = fixture.host.encoder(node).unwrap();
    assert_eq!(encoder.knobs.get("compression"), Some(&Value::from("PIZ")));
    assert_eq!(encoder.knobs.get("datatype"), Some(&Value::from("16 bit half")));
}

/// Placeholders with a known profile become write nodes
#[test]
fn test_placeholders_are_converted() {
    let fixture = HandlerFixture::saved(1).unwrap();
    fixture.host.add_placeholder("Exr Render", Some("fg"));
    fixture.host.add_placeholder("Retired Render", None);

    let created = fixture.handler.on_script_load();

    assert_eq!(created.len(), 1);
    assert_eq!(fixture.cached_path(created[0]), exr_render_path(1, "fg"));
    let remaining = fixture.host.placeholder_nodes();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].profile, "Retired Render");
}

/// A context switch resets every node against the new configuration
#[test]
fn test_context_switch_resets_nodes() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();
    fixture.save_as(3);
    fixture.handler.on_compute_path(node, ResolutionMode::Full).unwrap();
    assert_eq!(fixture.handler.path_state(node, ResolutionMode::Full), PathState::Locked);

    fixture.handler.set_configuration(&PipelineFixture::standard().parse().unwrap()).unwrap();

    assert_eq!(fixture.cached_path(node), exr_render_path(3, "beauty"));
    assert_eq!(fixture.handler.path_state(node, ResolutionMode::Full), PathState::Valid);
    assert_eq!(fixture.handler.preview_stats(), (0, 1));
}

/// Deleted nodes lose their transient state
#[test]
fn test_node_deleted() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    fixture.host.delete_node(node);
    fixture.handler.on_node_deleted(node);

    assert!(!fixture.handler.is_constructed(node));
    assert_eq!(fixture.handler.path_state(node, ResolutionMode::Full), PathState::Uncached);
    assert!(matches!(
        fixture.handler.compute_render_path(node),
        Err(WriteNodeError::NodeNotFound { .. })
    ));
}

use chrono::NaiveDate;
use std::cell::RefCell;
use std::rc::Rc;
use writenode::host::{Host, Knob};
use writenode::test_utils::{HandlerFixture, exr_render_path, work_file};
use writenode::writenode::{PathState, ResolutionMode};

/// A script path that moved without a save event locks the cached path
#[test]
fn test_changed_work_file_locks_path() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    fixture.save_as(2);
    let surfaced = fixture.handler.on_compute_path(node, ResolutionMode::Full).unwrap();

    assert_eq!(surfaced, exr_render_path(1, "beauty"));
    assert_eq!(fixture.cached_path(node), exr_render_path(1, "beauty"));
    assert_eq!(fixture.handler.path_state(node, ResolutionMode::Full), PathState::Locked);
    assert!(fixture.handler.render_path_is_locked(node));
    assert!(fixture.path_warning(node).contains("Reset Path"));
    assert!(fixture.host.knob_bool(node, Knob::ResetPathVisible));
}

/// Resetting a locked path unlocks it
#[test]
fn test_reset_clears_lock() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();
    fixture.save_as(5);
    fixture.handler.on_compute_path(node, ResolutionMode::Full).unwrap();
    assert!(fixture.handler.render_path_is_locked(node));

    fixture.handler.reset_render_path(node).unwrap();

    assert!(!fixture.handler.render_path_is_locked(node));
    assert_eq!(fixture.cached_path(node), exr_render_path(5, "beauty"));
    assert_eq!(fixture.path_warning(node), "");
    assert!(!fixture.host.knob_bool(node, Knob::ResetPathVisible));
    assert_eq!(fixture.host.knob_str(node, Knob::LastKnownScript), work_file(5));
}

/// Saving as a new file resets nodes to the new version
#[test]
fn test_save_as_new_file_resets_path() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("out")).unwrap();
    assert_eq!(fixture.cached_path(node), "/proj/sh010/renders/v001/sh010_out.%04d.exr");

    fixture.save_and_notify(2);

    assert_eq!(fixture.cached_path(node), "/proj/sh010/renders/v002/sh010_out.%04d.exr");
    assert_eq!(
        fixture.cached_proxy_path(node),
        "/proj/sh010/renders/v002/960x540/sh010_out.%04d.exr"
    );
    assert!(!fixture.handler.render_path_is_locked(node));
    assert_eq!(fixture.host.knob_str(node, Knob::LastKnownScript), work_file(2));
}

/// Saving over the same file leaves nodes alone
#[test]
fn test_save_in_place_keeps_locked_path() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();
    let pinned = "/proj/sh010/renders/v009/sh010_beauty.%04d.exr";
    fixture.host.set_knob(node, Knob::CachedPath, pinned.into());

    fixture.save_and_notify(1);

    assert_eq!(fixture.cached_path(node), pinned);
}

/// Resolution and date changes never lock a path
#[test]
fn test_volatile_fields_do_not_lock() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Dated Render", None).unwrap();
    assert_eq!(
        fixture.cached_path(node),
        "/proj/sh010/renders/2024_03_15/v001/1920x1080/sh010.%04d.exr"
    );

    fixture.host.set_dimensions(node, 2048, 858);
    fixture.clock.set(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());
    let surfaced = fixture.handler.on_compute_path(node, ResolutionMode::Full).unwrap();

    assert_eq!(surfaced, "/proj/sh010/renders/2024_04_02/v001/2048x858/sh010.%04d.exr");
    assert_eq!(fixture.cached_path(node), surfaced);
    assert_eq!(fixture.handler.path_state(node, ResolutionMode::Full), PathState::Valid);
    assert!(!fixture.handler.render_path_is_locked(node));
    assert_eq!(fixture.path_warning(node), "");
}

/// A recomputation that calls back into the handler gets the cached path
#[test]
fn test_reentrant_compute_returns_cached_path() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    let nested: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&nested);
    let handler = Rc::downgrade(&fixture.handler);
    fixture.host.set_dimension_hook(move |queried| {
        if let Some(handler) = handler.upgrade() {
            if let Some(path) = handler.on_compute_path(queried, ResolutionMode::Full) {
                seen.borrow_mut().push(path);
            }
        }
    });

    fixture.save_as(2);
    fixture.handler.reset_render_path(node).unwrap();
    fixture.host.clear_dimension_hook();

    let nested = nested.borrow();
    assert!(!nested.is_empty());
    assert_eq!(nested[0], exr_render_path(1, "beauty"));
    assert_eq!(fixture.cached_path(node), exr_render_path(2, "beauty"));
}

/// Paths are not recomputed while the node renders
#[test]
fn test_rendering_suppresses_recomputation() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    fixture.handler.on_before_render(node);
    fixture.save_as(2);
    fixture.handler.reset_render_path(node).unwrap();
    assert_eq!(
        fixture.handler.on_compute_path(node, ResolutionMode::Full).unwrap(),
        exr_render_path(1, "beauty")
    );
    assert_eq!(fixture.handler.path_state(node, ResolutionMode::Full), PathState::Valid);

    fixture.handler.on_after_render(node);
    fixture.handler.reset_render_path(node).unwrap();
    assert_eq!(fixture.cached_path(node), exr_render_path(2, "beauty"));
}

/// A cached path the template can no longer read is locked
#[test]
fn test_foreign_cached_path_is_locked() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();
    fixture.host.set_knob(node, Knob::CachedPath, "/elsewhere/render.%04d.exr".into());

    assert!(fixture.handler.render_path_is_locked(node));
    assert_eq!(
        fixture.handler.on_compute_path(node, ResolutionMode::Full).unwrap(),
        "/elsewhere/render.%04d.exr"
    );
    assert_eq!(fixture.handler.path_state(node, ResolutionMode::Full), PathState::Locked);
}

/// The output name drives the path only through expected changes
#[test]
fn test_output_change_is_not_a_lock() {
    let fixture = HandlerFixture::saved(1).unwrap();
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    fixture.set_output(node, "fg");

    assert_eq!(fixture.cached_path(node), exr_render_path(1, "fg"));
    assert!(!fixture.handler.render_path_is_locked(node));
}

/// Shot names containing underscores read back unambiguously
#[test]
fn test_underscored_shot_name_stays_unlocked() {
    let fixture = HandlerFixture::new().unwrap();
    fixture.host.set_script_path(Some("/proj/sh_010/work/nuke/sh_010_v001.nk"));
    let node = fixture.create_node("Dpx Render", None).unwrap();
    assert_eq!(fixture.cached_path(node), "/proj/sh_010/renders/v001/sh_010.%04d.dpx");

    let surfaced = fixture.handler.on_compute_path(node, ResolutionMode::Full).unwrap();
    assert_eq!(surfaced, "/proj/sh_010/renders/v001/sh_010.%04d.dpx");
    assert_eq!(fixture.handler.path_state(node, ResolutionMode::Full), PathState::Valid);
    assert!(!fixture.handler.render_path_is_locked(node));

    fixture.handler.reset_render_path(node).unwrap();
    assert!(!fixture.handler.render_path_is_locked(node));
    assert!(!fixture.host.knob_bool(node, Knob::ResetPathVisible));
}

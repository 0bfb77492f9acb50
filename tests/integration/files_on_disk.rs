use writenode::core::WriteNodeError;
use writenode::host::{Host, Knob};
use writenode::test_utils::{HandlerFixture, PipelineFixture, work_file_at};

use crate::common::TestProject;

fn fixture_in(project: &TestProject) -> HandlerFixture {
    let pipeline = PipelineFixture::standard().at_root(project.root());
    let fixture = HandlerFixture::with_pipeline(&pipeline).unwrap();
    fixture.host.set_script_path(Some(&work_file_at(&project.root_str(), 1)));
    fixture
}

/// Every rendered frame of the node's path is listed, nothing else
#[test]
fn test_files_on_disk_lists_frames() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();
    let fixture = fixture_in(&project);
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    assert!(fixture.handler.get_files_on_disk(node).unwrap().is_empty());

    project.touch("sh010/renders/v001/sh010_beauty.1002.exr").unwrap();
    project.touch("sh010/renders/v001/sh010_beauty.1001.exr").unwrap();
    project.touch("sh010/renders/v001/sh010_fg.1001.exr").unwrap();
    project.touch("sh010/renders/v002/sh010_beauty.1001.exr").unwrap();

    let root = project.root_str();
    assert_eq!(fixture.handler.get_files_on_disk(node).unwrap(), vec![
        format!("{root}/sh010/renders/v001/sh010_beauty.1001.exr"),
        format!("{root}/sh010/renders/v001/sh010_beauty.1002.exr"),
    ]);
}

/// Proxy frames live under the proxy template
#[test]
fn test_proxy_files_on_disk() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();
    let fixture = fixture_in(&project);
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();

    project.touch("sh010/renders/v001/960x540/sh010_beauty.1001.exr").unwrap();
    project.touch("sh010/renders/v001/2048x1080/sh010_beauty.1001.exr").unwrap();
    project.touch("sh010/renders/v001/sh010_beauty.1001.exr").unwrap();

    let root = project.root_str();
    assert_eq!(fixture.handler.get_proxy_files_on_disk(node).unwrap(), vec![format!(
        "{root}/sh010/renders/v001/960x540/sh010_beauty.1001.exr"
    )]);
}

/// A path its template cannot read back cannot be searched for
#[test]
fn test_files_on_disk_with_foreign_path() {
    let project = TestProject::new(PipelineFixture::standard()).unwrap();
    let fixture = fixture_in(&project);
    let node = fixture.create_node("Exr Render", Some("beauty")).unwrap();
    fixture.host.set_knob(node, Knob::CachedPath, "/elsewhere/render.%04d.exr".into());

    let err = fixture.handler.get_files_on_disk(node).unwrap_err();
    assert!(matches!(err, WriteNodeError::UnresolvedPath { .. }));
    assert!(err.to_string().contains("nuke_shot_render"));
}

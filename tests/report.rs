use privacy_lpp::privacy_plot::{data_file, figure_titles};
use privacy_lpp::utils::AccessError;
use privacy_lpp::generate_report;
use std::path::Path;

fn copy_fixture(fixture: &str, dir: &Path, name: &str) -> std::path::PathBuf {
    let fin = data_file(dir, name);
    std::fs::copy(Path::new("./test").join(fixture), &fin).unwrap();
    fin
}

#[test]
fn report_writes_three_figures_next_to_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let fin = copy_fixture("access_log.ndjson", dir.path(), "phone:2022?");
    let written = generate_report(&fin, "phone:2022?").unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "phone_2022_ Access Timelapse.png",
            "phone_2022_ Percentage of Accesses by Category.png",
            "phone_2022_ Percentage of Accesses by App Identifier.png",
        ]
    );
    for p in written.iter() {
        assert_eq!(p.parent().unwrap(), dir.path());
        let img = image::open(p).unwrap();
        assert!(img.width() > 0 && img.height() > 0);
    }
}

#[test]
fn rerun_overwrites_the_same_files() {
    let dir = tempfile::tempdir().unwrap();
    let fin = copy_fixture("access_log.ndjson", dir.path(), "phone");
    let first = generate_report(&fin, "phone").unwrap();
    let second = generate_report(&fin, "phone").unwrap();
    assert_eq!(first, second);
    let pngs = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .map(|e| e.path().extension().map_or(false, |x| x == "png"))
                .unwrap_or(false)
        })
        .count();
    assert_eq!(pngs, 3);
}

#[test]
fn report_without_accesses_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let fin = copy_fixture("no_accessor.ndjson", dir.path(), "empty");
    match generate_report(&fin, "empty") {
        Err(AccessError::EmptyData) => {}
        other => panic!("expected EmptyData, got {:?}", other),
    }
    let (timeline_title, _, _) = figure_titles("empty");
    assert!(!dir.path().join(format!("{}.png", timeline_title)).exists());
}

#[test]
fn missing_report_is_file_access_error() {
    let dir = tempfile::tempdir().unwrap();
    let fin = data_file(dir.path(), "nothing_here");
    assert!(matches!(
        generate_report(&fin, "nothing_here"),
        Err(AccessError::FileAccess { .. })
    ));
}

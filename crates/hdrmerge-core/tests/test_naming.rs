use hdrmerge_core::naming::{
    default_pattern, with_output_extension, FileNameIndex, OutputPathResolver,
};

fn resolver(paths: &[&str]) -> OutputPathResolver {
    OutputPathResolver::new(FileNameIndex::new(paths))
}

#[test]
fn test_index_sorts_and_wraps() {
    let index = FileNameIndex::new(["/b/z.CR2", "/a/IMG_3.CR2", "/a/b.tar.gz"]);
    assert_eq!(index.len(), 3);
    assert_eq!(index.base_name(0), "IMG_3.CR2");
    assert_eq!(index.base_name(-1), "z.CR2");
    assert_eq!(index.base_name(-3), "IMG_3.CR2");
    assert_eq!(index.base_name_no_ext(1), "b.tar");
    assert_eq!(index.number_suffix(0), "3");
    assert_eq!(index.number_suffix(1), "");
    assert_eq!(index.dir_name(2), "/b");
}

#[test]
fn test_index_out_of_range_is_empty() {
    let index = FileNameIndex::new(["/a/x.CR2"]);
    for i in [1, 2, -2, 100, i64::MIN, i64::MAX] {
        assert_eq!(index.base_name(i), "", "index {i}");
        assert_eq!(index.base_name_no_ext(i), "");
        assert_eq!(index.dir_name(i), "");
        assert_eq!(index.number_suffix(i), "");
    }
    let empty = FileNameIndex::new(Vec::<&str>::new());
    assert!(empty.is_empty());
    assert_eq!(empty.base_name(0), "");
    assert_eq!(empty.base_name(-1), "");
}

#[test]
fn test_negative_index_matches_last() {
    let sets: [&[&str]; 3] = [
        &["/x/one.nef"],
        &["/x/b.nef", "/x/a.nef"],
        &["/q/IMG_9.CR2", "/p/IMG_10.CR2", "/r/DSC_1.ARW", "/p/IMG_1.CR2"],
    ];
    for paths in sets {
        let r = resolver(paths);
        let last = format!("%if[{}]", paths.len() - 1);
        assert_eq!(r.resolve("%if[-1]", ""), r.resolve(&last, ""));
        assert_eq!(r.resolve("%in[-1]", ""), r.resolve(&last.replace("if", "in"), ""));
    }
}

#[test]
fn test_default_multi_pattern() {
    let r = resolver(&["/a/IMG_0012.CR2", "/a/IMG_0005.CR2"]);
    assert_eq!(r.resolve("%id[-1]/%iF[0]-%in[-1].dng", ""), "/a/IMG_0005-0012.dng");
    assert_eq!(r.resolve(default_pattern(2), ""), "/a/IMG_0005-0012.dng");
    assert_eq!(r.resolve(default_pattern(1), ""), "/a/IMG_0005.dng");
}

#[test]
fn test_percent_escape_is_not_rescanned() {
    let r = resolver(&["/a/IMG_1.CR2"]);
    assert_eq!(r.resolve("100%%", ""), "100%");
    assert_eq!(r.resolve("%%if[0]", ""), "%if[0]");
    assert_eq!(r.resolve("%%%if[0]", ""), "%IMG_1.CR2");
    assert_eq!(r.resolve("%%%%", ""), "%%");
}

#[test]
fn test_replacement_text_is_not_rescanned() {
    let r = resolver(&["/a/%if[0].CR2"]);
    assert_eq!(r.resolve("%if[0]", ""), "%if[0].CR2");
    assert_eq!(r.resolve("[%iF[0]]", ""), "[%if[0]]");
}

#[test]
fn test_malformed_tokens_are_verbatim() {
    let r = resolver(&["/a/IMG_1.CR2"]);
    for pattern in ["%", "%x", "%if", "%if[", "%if[a]", "%if[-]", "%iX[0]", "50%"] {
        assert_eq!(r.resolve(pattern, ""), pattern);
    }
    assert_eq!(r.resolve("%if%iF[0]", ""), "%ifIMG_1");
}

#[test]
fn test_unresolved_index_is_empty() {
    let r = resolver(&["/a/IMG_1.CR2"]);
    assert_eq!(r.resolve("x%if[5]y", ""), "xy");
    assert_eq!(r.resolve("x%if[99999999999999999999]y", ""), "xy");
}

#[test]
fn test_output_tokens_need_output_name() {
    let r = resolver(&["/a/IMG_1.CR2"]);
    assert_eq!(r.resolve("%od/%of.png", ""), "%od/%of.png");
    assert_eq!(r.resolve("%od/mask-%of.png", "/nonexistent/out/x.dng"), "/nonexistent/out/mask-x.dng.png");
    assert_eq!(r.resolve("%of", "relative.dng"), "relative.dng");
}

#[test]
fn test_output_extension_suffix() {
    assert_eq!(with_output_extension("a/b".into()), "a/b.dng");
    assert_eq!(with_output_extension("a/b.dng".into()), "a/b.dng");
    assert_eq!(with_output_extension("a/b.DNG".into()), "a/b.DNG.dng");
}

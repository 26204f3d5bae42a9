#[test]
fn source_map_is_emitted_when_requested() {
    let output = thistle::compile_string(
        "a {\n  color: red;\n}\n".to_string(),
        &thistle::Options::default().source_map(true),
    )
    .unwrap();

    let map = output.source_map.expect("expected a source map");
    let parsed: serde_json::Value = serde_json::from_str(&map).unwrap();

    assert_eq!(parsed["version"], 3);
    assert_eq!(parsed["file"], "stdin.css");
    assert_eq!(parsed["sources"][0], "stdin");
    assert_eq!(parsed["names"], serde_json::json!([]));
    assert!(parsed["mappings"].as_str().unwrap().contains(';'));
    assert!(parsed.get("sourcesContent").is_none());
}

#[test]
fn source_map_embeds_contents_when_requested() {
    let input = "a {\n  color: red;\n}\n";
    let output = thistle::compile_string(
        input.to_string(),
        &thistle::Options::default()
            .source_map(true)
            .source_map_contents(true),
    )
    .unwrap();

    let map = output.source_map.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&map).unwrap();

    assert_eq!(parsed["sourcesContent"][0], input);
}

#[test]
fn no_source_map_by_default() {
    let output = thistle::compile_string(
        "a {\n  color: red;\n}\n".to_string(),
        &thistle::Options::default(),
    )
    .unwrap();

    assert!(output.source_map.is_none());
}

#[test]
fn output_is_deterministic() {
    let input = "@for $i from 1 through 5 {\n  .w-#{$i} {\n    width: $i * 10px;\n  }\n}\n";

    let first = thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap();
    let second = thistle::from_string(input.to_string(), &thistle::Options::default()).unwrap();

    assert_eq!(first, second);
}

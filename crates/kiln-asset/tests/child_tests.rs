use kiln_asset::{
    Asset, AssetOptions, Content, DependencyKind, DependencyOptions, Environment, File, Stats,
    TransformResult,
};
use kiln_test_utils::{
    chunked_stream, sample_env, test_context, test_context_with, StaticConfigLoader,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::PathBuf;

fn parent(code: &str) -> Asset {
    Asset::new(
        AssetOptions::new(
            "/src/app.ts",
            "ts",
            sample_env(),
            Stats::new(12, Some(code.len() as u64)),
        )
        .with_content(code)
        .with_hash("parent-hash")
        .isolated(true),
        test_context(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_child_reusing_parent_content_inherits_hash_and_size() {
    let parent = parent("const a: number = 1;");
    let result = TransformResult::new("ts", parent.content().clone());

    let child = parent.create_child_asset(result).await.unwrap();

    assert_eq!(child.hash(), Some("parent-hash"));
    assert_eq!(child.stats(), Stats::new(0, Some(20)));
    assert_eq!(child.file_path(), parent.file_path());
}

#[tokio::test]
async fn test_child_with_new_content_is_rehashed() {
    let parent = parent("const a: number = 1;");
    let child = parent
        .create_child_asset(TransformResult::new("js", "const a = 1;"))
        .await
        .unwrap();

    assert_eq!(child.hash(), Some(kiln_asset::md5_hex(b"const a = 1;").as_str()));
    assert_eq!(child.stats().size, Some(12));
    assert_eq!(child.asset_type(), "js");
    assert_ne!(child.id(), parent.id());
    assert!(child.content_key().is_none());
    assert!(child.output_hash().is_none());
}

#[tokio::test]
async fn test_child_with_stream_content_has_unknown_size() {
    let parent = parent("x");
    let child = parent
        .create_child_asset(TransformResult::new("js", chunked_stream(b"streamed", 4)))
        .await
        .unwrap();

    assert_eq!(child.hash(), None);
    assert_eq!(child.stats().size, None);
    assert!(child.content().is_stream());
}

#[tokio::test]
async fn test_equal_text_in_new_allocation_is_not_the_same_source() {
    let parent = parent("same");
    let child = parent
        .create_child_asset(TransformResult::new("ts", Content::text("same")))
        .await
        .unwrap();

    assert_eq!(child.hash(), Some(kiln_asset::md5_hex(b"same").as_str()));
}

#[tokio::test]
async fn test_child_environment_and_meta_merge() {
    let mut parent = parent("x");
    parent.set_meta("sourceType", "module");
    parent.set_meta("keep", true);

    let env = Environment::new().with("context", "node");
    let child = parent
        .create_child_asset(
            TransformResult::new("js", "y")
                .with_env(env)
                .with_meta("sourceType", "script"),
        )
        .await
        .unwrap();

    assert_eq!(child.env().get("context"), Some(&json!("node")));
    assert_eq!(child.env().get("engines"), parent.env().get("engines"));
    assert_eq!(parent.env().get("context"), Some(&json!("browser")));
    assert_eq!(child.meta().get("sourceType"), Some(&json!("script")));
    assert_eq!(child.meta().get("keep"), Some(&json!(true)));
    assert_eq!(
        child.id(),
        Asset::derive_id(child.file_path(), "js", child.env()).unwrap()
    );
}

#[tokio::test]
async fn test_child_isolation_defaults_to_parent() {
    let parent = parent("x");
    let inherited = parent
        .create_child_asset(TransformResult::new("js", "y"))
        .await
        .unwrap();
    assert!(inherited.is_isolated());

    let overridden = parent
        .create_child_asset(TransformResult::new("js", "y").isolated(false))
        .await
        .unwrap();
    assert!(!overridden.is_isolated());
}

#[tokio::test]
async fn test_child_additions_never_reach_parent() {
    let mut parent = parent("import './b';");
    parent.add_dependency(DependencyOptions::new("./b")).unwrap();

    let child = parent
        .create_child_asset(
            TransformResult::new("js", "require('./b'); import('./c');")
                .with_dependency(DependencyOptions::new("./c").with_kind(DependencyKind::Async))
                .with_connected_file(File::new("/src/tsconfig.json").with_hash("cfg")),
        )
        .await
        .unwrap();

    assert_eq!(parent.dependencies().len(), 1);
    assert_eq!(child.dependencies().len(), 2);
    assert!(parent.connected_files().is_empty());
    assert_eq!(child.connected_files().len(), 1);
    assert!(!child.dependencies().shares_entries_with(parent.dependencies()));
}

#[tokio::test]
async fn test_child_without_additions_shares_parent_registries() {
    let mut parent = parent("x");
    parent.add_dependency(DependencyOptions::new("./b")).unwrap();

    let child = parent
        .create_child_asset(TransformResult::new("js", "y"))
        .await
        .unwrap();

    assert!(child.dependencies().shares_entries_with(parent.dependencies()));
    assert!(child.connected_files().shares_entries_with(parent.connected_files()));
}

#[tokio::test]
async fn test_child_hashes_connected_files_without_hash() {
    let harness = test_context_with(StaticConfigLoader::new());
    let parent = Asset::new(
        AssetOptions::new("/src/a.css", "css", Environment::new(), Stats::default())
            .with_content("a {}"),
        harness.ctx.clone(),
    )
    .unwrap();

    let child = parent
        .create_child_asset(
            TransformResult::new("css", "a{}")
                .with_connected_file(File::new("/src/.postcssrc"))
                .with_connected_file(File::new("/src/known").with_hash("given")),
        )
        .await
        .unwrap();

    assert_eq!(harness.file_hasher.calls(), 1);
    let known = child.connected_files().get(&PathBuf::from("/src/known")).unwrap();
    assert_eq!(known.hash.as_deref(), Some("given"));
    let hashed = child.connected_files().get(&PathBuf::from("/src/.postcssrc")).unwrap();
    assert!(hashed.hash.is_some());
}

#[tokio::test]
async fn test_dependency_ids_are_unique_and_stable() {
    let mut asset = parent("x");
    let first = asset.add_dependency(DependencyOptions::new("./b")).unwrap();
    let again = asset.add_dependency(DependencyOptions::new("./b")).unwrap();
    let lazy = asset
        .add_dependency(DependencyOptions::new("./b").with_kind(DependencyKind::Async))
        .unwrap();
    let other_env = asset
        .add_dependency(
            DependencyOptions::new("./b").with_env(Environment::new().with("context", "worker")),
        )
        .unwrap();

    assert_eq!(first, again);
    assert_ne!(first, lazy);
    assert_ne!(first, other_env);
    assert_eq!(asset.dependencies().len(), 3);

    let dep = asset.dependencies().get(&other_env).unwrap();
    assert_eq!(dep.env.get("context"), Some(&json!("worker")));
    assert_eq!(dep.env.get("engines"), asset.env().get("engines"));
    assert_eq!(dep.source_path, PathBuf::from("/src/app.ts"));
}

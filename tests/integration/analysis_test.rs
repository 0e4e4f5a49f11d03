//! Integration tests for the assetsweep analysis pipeline
//!
//! Each test lays out a small project on disk (content files plus dependency
//! sidecars) and runs the engine over it.

use assetsweep::analysis::Classification;
use assetsweep::config::{AnalysisConfig, Config, IndirectPolicy, IndirectSettings};
use assetsweep::engine::{registry_from_config, Engine};
use assetsweep::extract::{AssetMetadata, AssetRegistry, RegistryError, SidecarRegistry};
use assetsweep::graph::{AssetId, Direction};
use assetsweep::index::AssetDescriptor;
use assetsweep::plan::{CleanupReason, PlanError};
use assetsweep::report::{AnalysisStatus, AnalysisWarning, ClassificationReport};
use assetsweep::CancellationToken;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// On-disk project fixture
struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let project = Self {
            dir: TempDir::new().unwrap(),
        };
        fs::create_dir_all(project.content()).unwrap();
        project
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn content(&self) -> PathBuf {
        self.dir.path().join("Content")
    }

    /// Write an asset file and, if given, its sidecar
    fn asset(&self, rel: &str, sidecar: Option<&str>) -> &Self {
        let path = self.content().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"binary asset").unwrap();
        if let Some(json) = sidecar {
            fs::write(format!("{}.deps.json", path.display()), json).unwrap();
        }
        self
    }

    fn file(&self, rel: &str, contents: &str) -> &Self {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        self
    }

    fn config(&self) -> AnalysisConfig {
        AnalysisConfig::new(self.root().to_path_buf())
    }

    fn engine(&self) -> Engine {
        Engine::new(Box::new(SidecarRegistry::default()))
    }
}

fn id(path: &str) -> AssetId {
    AssetId::new(path)
}

/// Assert that a refreshed report equals a full pass by a fresh engine
fn assert_matches_full_pass(project: &Project, config: &AnalysisConfig, refreshed: &ClassificationReport) {
    let mut full = project.engine().run_analysis(config).unwrap();
    full.generation = refreshed.generation;
    assert_eq!(refreshed, &full);
}

#[test]
fn test_hard_reference_from_root_is_used() {
    let project = Project::new();
    project
        .asset("Maps/LevelA.umap", Some(r#"{"class": "World", "hard": ["/Game/Textures/Texture1"]}"#))
        .asset("Textures/Texture1.uasset", Some(r#"{"class": "Texture2D"}"#))
        .asset("Textures/Texture2.uasset", Some(r#"{"class": "Texture2D"}"#));

    let mut engine = project.engine();
    let report = engine.run_analysis(&project.config()).unwrap();

    assert_eq!(report.status, AnalysisStatus::Complete);
    assert_eq!(report.classification("/Game/Maps/LevelA"), Some(Classification::Used));
    assert_eq!(report.classification("/Game/Textures/Texture1"), Some(Classification::Used));
    assert_eq!(report.classification("/Game/Textures/Texture2"), Some(Classification::Unused));

    let level = report.asset(&id("/Game/Maps/LevelA")).unwrap();
    assert!(level.is_root);
    assert_eq!(
        report.asset(&id("/Game/Textures/Texture1")).unwrap().reached_via,
        Some(id("/Game/Maps/LevelA"))
    );

    let plan = engine.compute_plan(&report).unwrap();
    assert_eq!(plan.step_ids(), vec![&id("/Game/Textures/Texture2")]);
    assert_eq!(plan.steps[0].reason, CleanupReason::Unreferenced);
    assert!(plan.blocked.is_empty());
    assert!(plan.needs_confirmation.is_empty());
}

#[test]
fn test_unreachable_cycle_is_circular_and_never_planned() {
    let project = Project::new();
    project
        .asset("Maps/LevelA.umap", None)
        .asset("Loop/AssetX.uasset", Some(r#"{"class": "Blueprint", "hard": ["/Game/Loop/AssetY"]}"#))
        .asset("Loop/AssetY.uasset", Some(r#"{"class": "Blueprint", "hard": ["/Game/Loop/AssetX"]}"#));

    let mut engine = project.engine();
    let report = engine.run_analysis(&project.config()).unwrap();

    assert_eq!(report.classification("/Game/Loop/AssetX"), Some(Classification::Circular));
    assert_eq!(report.classification("/Game/Loop/AssetY"), Some(Classification::Circular));
    assert_eq!(
        report.cycles,
        vec![vec![id("/Game/Loop/AssetX"), id("/Game/Loop/AssetY")]]
    );

    let plan = engine.compute_plan(&report).unwrap();
    assert!(plan.steps.is_empty());
    assert_eq!(plan.needs_confirmation.len(), 2);
    assert!(plan
        .needs_confirmation
        .iter()
        .all(|c| c.reason == CleanupReason::CircularIsland));
    assert!(plan.folders_to_remove.is_empty());
}

#[test]
fn test_soft_only_reference_needs_confirmation() {
    let project = Project::new();
    project
        .asset("Maps/LevelA.umap", Some(r#"{"class": "World", "soft": ["/Game/UI/Widget1.Widget1"]}"#))
        .asset("UI/Widget1.uasset", Some(r#"{"class": "WidgetBlueprint"}"#));

    let mut engine = project.engine();
    let report = engine.run_analysis(&project.config()).unwrap();

    assert_eq!(
        report.classification("/Game/UI/Widget1"),
        Some(Classification::IndirectlyUsed)
    );

    let plan = engine.compute_plan(&report).unwrap();
    assert!(plan.steps.is_empty());
    assert_eq!(plan.needs_confirmation.len(), 1);
    assert_eq!(plan.needs_confirmation[0].id, id("/Game/UI/Widget1"));
    assert_eq!(plan.needs_confirmation[0].reason, CleanupReason::SoftReferencedOnly);
}

#[test]
fn test_failed_extraction_keeps_asset_with_warning() {
    let project = Project::new();
    project
        .asset("Maps/LevelA.umap", Some(r#"{"class": "World", "hard": ["/Game/Props/AssetZ"]}"#))
        .asset("Props/AssetZ.uasset", Some("{ this is not json"))
        .asset("Props/Other.uasset", Some(r#"{"class": "StaticMesh"}"#));

    let mut engine = project.engine();
    let report = engine.run_analysis(&project.config()).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.counts.total, 3);
    assert_eq!(report.classification("/Game/Props/AssetZ"), Some(Classification::Used));
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        AnalysisWarning::Extraction { asset, .. } if asset == &id("/Game/Props/AssetZ")
    )));

    let graph = engine.graph().unwrap();
    assert!(graph
        .neighbors(&id("/Game/Props/AssetZ"), Direction::Outgoing)
        .is_empty());
    assert_eq!(report.classification("/Game/Props/Other"), Some(Classification::Unused));
}

#[test]
fn test_dangling_reference_is_recorded_not_linked() {
    let project = Project::new();
    project.asset(
        "Maps/LevelA.umap",
        Some(r#"{"class": "World", "hard": ["/Engine/BasicShapes/Cube", "/Game/Missing/T_Gone"]}"#),
    );

    let mut engine = project.engine();
    let report = engine.run_analysis(&project.config()).unwrap();

    let level = report.asset(&id("/Game/Maps/LevelA")).unwrap();
    assert_eq!(level.external_refs.len(), 2);

    let dangling: Vec<_> = report
        .warnings
        .iter()
        .filter(|w| matches!(w, AnalysisWarning::DanglingReference { .. }))
        .collect();
    assert_eq!(dangling.len(), 2);
    assert_eq!(engine.graph().unwrap().edge_count(), 0);
}

#[test]
fn test_blocked_dependency_of_excluded_asset() {
    let project = Project::new();
    project
        .asset("Maps/LevelA.umap", None)
        .asset(
            "Legacy/BP_Old.uasset",
            Some(r#"{"class": "Blueprint", "hard": ["/Game/Textures/T_Old"]}"#),
        )
        .asset("Textures/T_Old.uasset", Some(r#"{"class": "Texture2D"}"#))
        .asset("Textures/T_Free.uasset", Some(r#"{"class": "Texture2D"}"#));

    let config = project
        .config()
        .with_exclude_paths(vec!["/Game/Legacy".to_string()]);
    let mut engine = project.engine();
    let report = engine.run_analysis(&config).unwrap();

    assert_eq!(report.classification("/Game/Legacy/BP_Old"), Some(Classification::Excluded));
    assert_eq!(report.classification("/Game/Textures/T_Old"), Some(Classification::Unused));

    let plan = engine.compute_plan(&report).unwrap();
    assert_eq!(plan.step_ids(), vec![&id("/Game/Textures/T_Free")]);
    assert_eq!(plan.blocked.len(), 1);
    assert_eq!(plan.blocked[0].id, id("/Game/Textures/T_Old"));
    assert_eq!(plan.blocked[0].reason, CleanupReason::HardReferencedByKeptAsset);
    assert!(plan.blocked[0].blocked_by.contains(&id("/Game/Legacy/BP_Old")));
}

#[test]
fn test_root_wins_over_exclusion_and_redirectors_are_excluded() {
    let project = Project::new();
    project
        .asset("Maps/LevelA.umap", None)
        .asset("Core/GameData.uasset", Some(r#"{"class": "DataAsset"}"#))
        .asset("Moved/OldName.uasset", Some(r#"{"class": "ObjectRedirector", "hard": ["/Game/Core/GameData"]}"#))
        .asset("Tools/EUW_Helper.uasset", Some(r#"{"class": "EditorUtilityWidgetBlueprint"}"#));

    let config = project
        .config()
        .with_roots(vec!["/Game/Core/GameData".to_string()])
        .with_exclude_paths(vec!["/Game/Core/*".to_string()]);
    let mut engine = project.engine();
    let report = engine.run_analysis(&config).unwrap();

    assert_eq!(report.classification("/Game/Core/GameData"), Some(Classification::Used));
    assert_eq!(report.classification("/Game/Moved/OldName"), Some(Classification::Excluded));
    assert!(report.asset(&id("/Game/Moved/OldName")).unwrap().is_redirector);
    assert_eq!(report.classification("/Game/Tools/EUW_Helper"), Some(Classification::Excluded));

    let plan = engine.compute_plan(&report).unwrap();
    assert!(plan.steps.is_empty());
}

#[test]
fn test_source_reference_roots_asset() {
    let project = Project::new();
    project
        .asset("UI/W_Hud.uasset", Some(r#"{"class": "WidgetBlueprint", "hard": ["/Game/UI/T_Icon"]}"#))
        .asset("UI/T_Icon.uasset", Some(r#"{"class": "Texture2D"}"#))
        .file(
            "Source/MyGame/HudLoader.cpp",
            "#include \"HudLoader.h\"\n\nstatic ConstructorHelpers::FClassFinder<UUserWidget> Hud(TEXT(\"/Game/UI/W_Hud.W_Hud_C\"));\n",
        );

    let mut engine = project.engine();
    let report = engine.run_analysis(&project.config()).unwrap();

    assert_eq!(report.classification("/Game/UI/W_Hud"), Some(Classification::Used));
    assert_eq!(report.classification("/Game/UI/T_Icon"), Some(Classification::Used));
    assert_eq!(report.indirect_references.len(), 1);
    let reference = &report.indirect_references[0];
    assert_eq!(reference.target, id("/Game/UI/W_Hud"));
    assert_eq!(reference.line, 3);
    assert!(reference.file.ends_with("Source/MyGame/HudLoader.cpp"));
}

#[test]
fn test_soft_indirect_policy_and_plugin_config() {
    let project = Project::new();
    project
        .asset("Data/DT_Items.uasset", Some(r#"{"class": "DataTable", "hard": ["/Game/Data/T_Item"]}"#))
        .asset("Data/T_Item.uasset", Some(r#"{"class": "Texture2D"}"#))
        .file(
            "Plugins/Inventory/Config/DefaultInventory.ini",
            "[/Script/Inventory.Settings]\nItemTable=/Game/Data/DT_Items.DT_Items\n",
        );

    let config = project.config().with_indirect(IndirectSettings {
        policy: IndirectPolicy::Soft,
        ..IndirectSettings::default()
    });
    let mut engine = project.engine();
    let report = engine.run_analysis(&config).unwrap();

    assert_eq!(
        report.classification("/Game/Data/DT_Items"),
        Some(Classification::IndirectlyUsed)
    );
    assert_eq!(
        report.classification("/Game/Data/T_Item"),
        Some(Classification::IndirectlyUsed)
    );

    // Same project with indirect scanning off
    let report = engine.run_analysis(&project.config().without_indirect()).unwrap();
    assert_eq!(report.classification("/Game/Data/DT_Items"), Some(Classification::Unused));
}

#[test]
fn test_scan_rules_non_engine_files_and_empty_folders() {
    let project = Project::new();
    project
        .asset("Maps/LevelA.umap", None)
        .asset("Developers/jdoe/Scratch.uasset", None)
        .asset("Collections/Favorites.uasset", None)
        .asset("Maps/LevelA/__ExternalActors__/A1/ABC.uasset", None)
        .file("Content/Docs/readme.txt", "notes");
    fs::create_dir_all(project.content().join("Empty/Deeper")).unwrap();

    let mut engine = project.engine();
    let report = engine.run_analysis(&project.config()).unwrap();

    assert_eq!(report.counts.total, 1);
    assert_eq!(
        report.non_engine_files,
        vec![project.content().join("Docs/readme.txt")]
    );
    assert!(report.empty_folders.contains(&project.content().join("Empty")));
    assert!(report.empty_folders.contains(&project.content().join("Empty/Deeper")));
    assert!(!report.empty_folders.contains(&project.content().join("Docs")));

    // Developer content is opt-in
    let config = project.config().with_developer_content(true);
    let report = engine.run_analysis(&config).unwrap();
    assert_eq!(
        report.classification("/Game/Developers/jdoe/Scratch"),
        Some(Classification::Unused)
    );
}

#[test]
fn test_plan_removes_folders_left_empty() {
    let project = Project::new();
    project
        .asset("Maps/LevelA.umap", None)
        .asset("Old/Props/SM_Crate.uasset", Some(r#"{"class": "StaticMesh", "hard": ["/Game/Old/T_Crate"]}"#))
        .asset("Old/T_Crate.uasset", None)
        .file("Content/Kept/readme.txt", "keep me");
    fs::create_dir_all(project.content().join("Kept/Empty")).unwrap();

    let mut engine = project.engine();
    let report = engine.run_analysis(&project.config()).unwrap();
    let plan = engine.compute_plan(&report).unwrap();

    // Dependencies first
    assert_eq!(
        plan.step_ids(),
        vec![&id("/Game/Old/T_Crate"), &id("/Game/Old/Props/SM_Crate")]
    );
    assert_eq!(plan.steps[0].reason, CleanupReason::Unreachable);
    assert_eq!(plan.steps[1].reason, CleanupReason::Unreferenced);
    assert_eq!(
        plan.folders_to_remove,
        vec![
            project.content().join("Kept/Empty"),
            project.content().join("Old/Props"),
            project.content().join("Old"),
        ]
    );
}

#[test]
fn test_manifest_registry_from_config() {
    let project = Project::new();
    project
        .asset("Maps/LevelA.umap", None)
        .asset("Meshes/SM_Rock.uasset", None)
        .asset("Meshes/SM_Unlisted.uasset", None)
        .file(
            "Saved/registry.json",
            r#"{"assets": {
                "/Game/Maps/LevelA": {"class": "World", "hard": ["/Game/Meshes/SM_Rock"]},
                "/Game/Meshes/SM_Rock": {"class": "StaticMesh"}
            }}"#,
        );

    let config: Config = serde_yaml::from_str("registry:\n  manifest: Saved/registry.json\n").unwrap();
    let registry = registry_from_config(&config, project.root()).unwrap();
    let mut engine = Engine::new(registry);
    let report = engine
        .run_analysis(&config.analysis_config(project.root()))
        .unwrap();

    assert_eq!(report.classification("/Game/Meshes/SM_Rock"), Some(Classification::Used));
    assert!(report.warnings.iter().any(|w| matches!(
        w,
        AnalysisWarning::Extraction { asset, .. } if asset == &id("/Game/Meshes/SM_Unlisted")
    )));
}

/// Registry that cancels the engine on its first query
struct CancellingRegistry {
    token: Arc<Mutex<Option<CancellationToken>>>,
}

impl AssetRegistry for CancellingRegistry {
    fn describe(&self, _asset: &AssetDescriptor) -> Result<AssetMetadata, RegistryError> {
        if let Some(token) = self.token.lock().unwrap().as_ref() {
            token.cancel();
        }
        Ok(AssetMetadata::default())
    }
}

#[test]
fn test_cancelled_run_reports_partial_status_and_refuses_plan() {
    let project = Project::new();
    for n in 0..20 {
        project.asset(&format!("Props/SM_{:02}.uasset", n), None);
    }

    let slot = Arc::new(Mutex::new(None));
    let mut engine = Engine::new(Box::new(CancellingRegistry { token: slot.clone() }));
    *slot.lock().unwrap() = Some(engine.cancel_handle());

    let report = engine
        .run_analysis(&project.config().with_threads(1))
        .unwrap();

    assert_eq!(report.status, AnalysisStatus::Cancelled);
    assert_eq!(engine.compute_plan(&report), Err(PlanError::Incomplete));
}

#[test]
fn test_reanalysis_is_deterministic() {
    let project = Project::new();
    project
        .asset("Maps/LevelA.umap", Some(r#"{"class": "World", "hard": ["/Game/A", "/Game/B"], "soft": ["/Game/C"]}"#))
        .asset("A.uasset", Some(r#"{"hard": ["/Game/B"]}"#))
        .asset("B.uasset", None)
        .asset("C.uasset", Some(r#"{"hard": ["/Game/D"]}"#))
        .asset("D.uasset", None)
        .asset("E.uasset", Some(r#"{"hard": ["/Game/D"]}"#));

    let mut engine = project.engine();
    let config = project.config().with_threads(4);
    let mut first = engine.run_analysis(&config).unwrap();
    let second = engine.run_analysis(&config).unwrap();

    assert_eq!(second.generation, first.generation + 1);
    first.generation = second.generation;
    assert_eq!(first, second);
}

#[test]
fn test_refresh_matches_full_pass_after_remove_and_restore() {
    let project = Project::new();
    let game_mode = r#"{"class": "Blueprint", "hard": ["/Game/BP/T_Emblem"]}"#;
    project
        .asset("Maps/LevelA.umap", Some(r#"{"class": "World"}"#))
        .asset("BP/BP_GameMode.uasset", Some(game_mode))
        .asset("BP/T_Emblem.uasset", Some(r#"{"class": "Texture2D"}"#))
        .file(
            "Config/DefaultEngine.ini",
            "[/Script/EngineSettings.GameMapsSettings]\nGlobalDefaultGameMode=/Game/BP/BP_GameMode.BP_GameMode_C\n",
        );

    let config = project.config();
    let mut engine = project.engine();
    let report = engine.run_analysis(&config).unwrap();
    assert_eq!(report.classification("/Game/BP/BP_GameMode"), Some(Classification::Used));

    let asset = project.content().join("BP/BP_GameMode.uasset");
    let sidecar = project.content().join("BP/BP_GameMode.uasset.deps.json");
    let changed = vec![asset.clone(), sidecar.clone()];

    fs::remove_file(&asset).unwrap();
    fs::remove_file(&sidecar).unwrap();
    let removed = engine.refresh(&changed).unwrap();
    assert_eq!(removed.classification("/Game/BP/BP_GameMode"), None);
    assert!(removed.indirect_references.is_empty());
    assert_matches_full_pass(&project, &config, &removed);

    project.asset("BP/BP_GameMode.uasset", Some(game_mode));
    let restored = engine.refresh(&changed).unwrap();
    assert_eq!(restored.classification("/Game/BP/BP_GameMode"), Some(Classification::Used));
    assert_eq!(restored.classification("/Game/BP/T_Emblem"), Some(Classification::Used));
    assert_matches_full_pass(&project, &config, &restored);

    let plan = engine.compute_plan(&restored).unwrap();
    assert!(plan.steps.is_empty());
}

#[test]
fn test_refresh_matches_full_pass_for_scan_ignored_file() {
    let project = Project::new();
    project
        .asset("Maps/LevelA.umap", Some(r#"{"class": "World"}"#))
        .file("Content/Docs/readme.txt", "notes");

    let config = project.config();
    let mut engine = project.engine();
    engine.run_analysis(&config).unwrap();

    project
        .asset("Developers/me/T_Dev.uasset", Some(r#"{"class": "Texture2D"}"#))
        .file("Content/Developers/me/todo.txt", "later")
        .file("Content/.backup/LevelA.umap.bak", "old");
    let changed = vec![
        project.content().join("Developers/me/T_Dev.uasset"),
        project.content().join("Developers/me/T_Dev.uasset.deps.json"),
        project.content().join("Developers/me/todo.txt"),
        project.content().join(".backup/LevelA.umap.bak"),
    ];
    let report = engine.refresh(&changed).unwrap();

    assert_eq!(report.non_engine_files, vec![project.content().join("Docs/readme.txt")]);
    assert_eq!(report.classification("/Game/Developers/me/T_Dev"), None);
    assert_matches_full_pass(&project, &config, &report);
}

#[test]
fn test_refresh_matches_full_pass_after_rename() {
    let project = Project::new();
    project
        .asset(
            "Maps/LevelA.umap",
            Some(r#"{"class": "World", "hard": ["/Game/Textures/T_Brick"]}"#),
        )
        .asset("Old/T_Brick.uasset", Some(r#"{"class": "Texture2D"}"#));

    let config = project.config();
    let mut engine = project.engine();
    let report = engine.run_analysis(&config).unwrap();
    assert_eq!(report.classification("/Game/Old/T_Brick"), Some(Classification::Unused));

    let old_asset = project.content().join("Old/T_Brick.uasset");
    let old_sidecar = project.content().join("Old/T_Brick.uasset.deps.json");
    let new_asset = project.content().join("Textures/T_Brick.uasset");
    let new_sidecar = project.content().join("Textures/T_Brick.uasset.deps.json");
    fs::create_dir_all(project.content().join("Textures")).unwrap();
    fs::rename(&old_asset, &new_asset).unwrap();
    fs::rename(&old_sidecar, &new_sidecar).unwrap();

    let report = engine
        .refresh(&[old_asset, old_sidecar, new_asset, new_sidecar])
        .unwrap();

    assert_eq!(report.classification("/Game/Old/T_Brick"), None);
    assert_eq!(report.classification("/Game/Textures/T_Brick"), Some(Classification::Used));
    assert!(report.empty_folders.contains(&project.content().join("Old")));
    assert!(report.warnings.is_empty());
    assert_matches_full_pass(&project, &config, &report);
}

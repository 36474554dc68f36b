//! Adapters that capture a child compilation's output on either hook surface.
//!
//! The driver only sees [`SubBuildHookAdapter`]. Which implementation it gets
//! is decided once, by [`select_hook_adapter`] probing the engine.

use std::sync::{Arc, Mutex, PoisonError};

use quill_bundle::{ChildCompiler, Compiler, EngineError, HookSurface, ProcessAssetsStage};

const PLUGIN_NAME: &str = "quill-resource-capture";

/// The emitted module and source map taken out of a child's asset set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// The emitted module, if the child produced one.
    pub code: Option<String>,
    /// The adjacent source map, if any.
    pub map: Option<String>,
}

/// Attaches output capture to a child compilation.
pub trait SubBuildHookAdapter: Send + Sync {
    /// The hook surface this adapter taps.
    fn surface(&self) -> HookSurface;

    /// Taps `child` so that the asset named `output_name` and its source map
    /// are moved into `slot` and removed from the child's assets.
    fn attach(
        &self,
        child: &mut ChildCompiler<'_>,
        output_name: &str,
        slot: Arc<Mutex<CapturedOutput>>,
    ) -> Result<(), EngineError>;
}

/// Capture through the legacy `additional-assets` hook.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyAssetHooks;

impl SubBuildHookAdapter for LegacyAssetHooks {
    fn surface(&self) -> HookSurface {
        HookSurface::AdditionalAssets
    }

    fn attach(
        &self,
        child: &mut ChildCompiler<'_>,
        output_name: &str,
        slot: Arc<Mutex<CapturedOutput>>,
    ) -> Result<(), EngineError> {
        let name = output_name.to_string();
        child.hooks_mut().tap_additional_assets(PLUGIN_NAME, move |assets| {
            let Some(asset) = assets.remove(&name) else {
                return;
            };
            let map_name = asset.related_map.clone().unwrap_or_else(|| format!("{name}.map"));
            let map = assets.remove(&map_name).map(|a| a.source);
            store(&slot, asset.source, map);
        })
    }
}

/// Capture through the staged `process-assets` hook.
///
/// Taps at [`ProcessAssetsStage::Report`] so every other plugin has finished
/// with the asset first.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessAssetsHooks;

impl SubBuildHookAdapter for ProcessAssetsHooks {
    fn surface(&self) -> HookSurface {
        HookSurface::ProcessAssets
    }

    fn attach(
        &self,
        child: &mut ChildCompiler<'_>,
        output_name: &str,
        slot: Arc<Mutex<CapturedOutput>>,
    ) -> Result<(), EngineError> {
        let name = output_name.to_string();
        child
            .hooks_mut()
            .tap_process_assets(PLUGIN_NAME, ProcessAssetsStage::Report, move |table| {
                let Some(asset) = table.delete(&name) else {
                    return;
                };
                let map_name = asset.related_map.clone().unwrap_or_else(|| format!("{name}.map"));
                let map = table.delete(&map_name).map(|a| a.source);
                store(&slot, asset.source, map);
            })
    }
}

fn store(slot: &Mutex<CapturedOutput>, code: String, map: Option<String>) {
    let mut captured = slot.lock().unwrap_or_else(PoisonError::into_inner);
    captured.code = Some(code);
    captured.map = map;
}

/// Picks the adapter for the hook surface `compiler` provides.
pub fn select_hook_adapter(compiler: &Compiler) -> Box<dyn SubBuildHookAdapter> {
    if compiler.supports(HookSurface::ProcessAssets) {
        Box::new(ProcessAssetsHooks)
    } else {
        Box::new(LegacyAssetHooks)
    }
}

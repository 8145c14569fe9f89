//! On-disk sale state: the sale snapshot plus the ledger it mints into.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use hardcap_core::ledger::MemoryCreditLedger;
use hardcap_sale::{Crowdsale, SaleSnapshot};

#[derive(Serialize, Deserialize)]
struct StateFile {
    sale: SaleSnapshot,
    ledger: MemoryCreditLedger,
}

/// `<data dir>/hardcap/sale.json`, or `./hardcap/sale.json` if there is no data dir.
pub fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hardcap")
        .join("sale.json")
}

pub fn load(path: &Path) -> Result<Crowdsale<MemoryCreditLedger>> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let state: StateFile =
        serde_json::from_slice(&bytes).with_context(|| format!("corrupt state file {}", path.display()))?;
    Crowdsale::restore(state.sale, state.ledger).context("state file does not describe a valid sale")
}

/// Write the state through a temporary file so a crash never leaves a torn file.
pub fn save(path: &Path, sale: &Crowdsale<MemoryCreditLedger>) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let state = StateFile { sale: sale.snapshot(), ledger: sale.ledger().clone() };
    let json = serde_json::to_vec_pretty(&state)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Refuse to clobber an existing sale unless forced.
pub fn ensure_absent(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Ok(())
}

//! Prints every CRD the provider serves as one multi-document YAML stream.
//!
//! ```bash
//! crdgen | kubectl apply -f -
//! ```

use anyhow::{Context, Result};
use provider_aws::crd::all_crds;

fn main() -> Result<()> {
    for crd in all_crds() {
        let name = crd.metadata.name.clone().unwrap_or_default();
        let yaml = serde_yaml::to_string(&crd)
            .with_context(|| format!("Failed to serialize CRD {name}"))?;
        println!("---");
        print!("{yaml}");
    }
    Ok(())
}

//! Prints the CassandraDatacenter CRD manifest as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/cassandradatacenter.yaml`

use crds::CassandraDatacenter;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = CassandraDatacenter::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}

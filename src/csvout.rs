//! Long-format CSV export of simulated datasets.
//!
//! One row per observation, with the participant and item attributes
//! repeated, so a dataset can be handed directly to an external
//! cumulative-link mixed-model estimator.

use crate::simulate::Dataset;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const CSV_HEADER: &str =
    "participant,age,item,item_type,neg_eval,focus,constituent,sequence,te_dat,double_neg,y";

pub fn write_csv(path: &Path, dataset: &Dataset) -> std::io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "{}", CSV_HEADER)?;
    for obs in &dataset.observations {
        let participant = dataset.participant(obs.participant);
        let item = dataset.item(obs.item);
        let f = &item.features;
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{}",
            participant.id,
            participant.age,
            item.id,
            item.kind.label(),
            f.neg_eval,
            f.focus,
            f.constituent,
            f.sequence,
            f.te_dat,
            f.double_neg,
            obs.response
        )?;
    }
    file.flush()
}

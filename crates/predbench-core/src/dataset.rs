//! CIFAR binary dataset loading
//!
//! The benchmark corpus is the binary CIFAR file format: each record is one
//! label byte followed by 3072 feature bytes, repeated 10_000 times. Bytes
//! become f64 features with no normalization. A path without the binary
//! marker is refused outright, since a python-format file would silently
//! corrupt every derived vector.

use std::collections::HashMap;
use std::path::Path;

/// Feature bytes per record (a flattened 32x32x3 image)
pub const RECORD_DIM: usize = 3072;
/// Records in one CIFAR binary batch file
pub const RECORDS_PER_FILE: usize = 10_000;

/// CIFAR label index for the plane class
pub const CIFAR_PLANE_INDEX: u8 = 0;
/// CIFAR label index for the bird class
pub const CIFAR_BIRD_INDEX: u8 = 2;
/// Target value assigned to plane datapoints after concatenation
pub const PLANE_TARGET: f64 = 1.0;
/// Target value assigned to bird datapoints after concatenation
pub const BIRD_TARGET: f64 = 0.0;

/// Error type for dataset loading
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// Path does not reference the binary CIFAR format
    #[error("'{0}' is not a binary CIFAR data file; specify the full path of the .bin file")]
    NotBinaryFormat(String),

    /// File could not be read
    #[error("failed to read dataset file '{path}': {reason}")]
    Io { path: String, reason: String },

    /// File ended before the expected record count
    #[error("dataset file '{path}' is truncated: expected {expected} bytes, found {found}")]
    Truncated {
        path: String,
        expected: usize,
        found: usize,
    },

    /// A requested label partition has no datapoints
    #[error("dataset contains no datapoints with label {0}")]
    MissingLabel(u8),
}

/// Feature vectors partitioned by their CIFAR label byte
pub type LabelPartitions = HashMap<u8, Vec<Vec<f64>>>;

/// Load the CIFAR binary file at `path` into label-partitioned vectors
pub fn load_cifar(path: impl AsRef<Path>) -> Result<LabelPartitions, DatasetError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    // Loose check that the binary dataset (not the python-compatible
    // dataset) is being used
    if !display.contains(".bin") {
        return Err(DatasetError::NotBinaryFormat(display));
    }

    let bytes = std::fs::read(path).map_err(|e| DatasetError::Io {
        path: display.clone(),
        reason: e.to_string(),
    })?;

    let expected = RECORDS_PER_FILE * (1 + RECORD_DIM);
    if bytes.len() < expected {
        return Err(DatasetError::Truncated {
            path: display,
            expected,
            found: bytes.len(),
        });
    }

    let mut partitions: LabelPartitions = HashMap::new();
    for record in bytes.chunks_exact(1 + RECORD_DIM).take(RECORDS_PER_FILE) {
        let label = record[0];
        let features: Vec<f64> = record[1..].iter().map(|&b| f64::from(b)).collect();
        partitions.entry(label).or_default().push(features);
    }
    tracing::debug!(
        records = RECORDS_PER_FILE,
        labels = partitions.len(),
        "loaded CIFAR data"
    );
    Ok(partitions)
}

/// Concatenate the plane and bird partitions into one ordered corpus
///
/// Plane vectors come first, then bird vectors; the parallel target vector
/// carries [`PLANE_TARGET`] for every plane position and [`BIRD_TARGET`] for
/// every bird position.
pub fn concatenate_datapoints(
    mut partitions: LabelPartitions,
) -> Result<(Vec<Vec<f64>>, Vec<f64>), DatasetError> {
    let mut planes = partitions
        .remove(&CIFAR_PLANE_INDEX)
        .ok_or(DatasetError::MissingLabel(CIFAR_PLANE_INDEX))?;
    let birds = partitions
        .remove(&CIFAR_BIRD_INDEX)
        .ok_or(DatasetError::MissingLabel(CIFAR_BIRD_INDEX))?;

    let mut targets = Vec::with_capacity(planes.len() + birds.len());
    targets.extend(std::iter::repeat(PLANE_TARGET).take(planes.len()));
    targets.extend(std::iter::repeat(BIRD_TARGET).take(birds.len()));

    planes.extend(birds);
    Ok((planes, targets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Write a CIFAR-format file whose record labels cycle through `labels`
    fn write_cifar_file(dir: &tempfile::TempDir, name: &str, labels: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for i in 0..RECORDS_PER_FILE {
            let label = labels[i % labels.len()];
            file.write_all(&[label]).unwrap();
            let features = vec![(i % 256) as u8; RECORD_DIM];
            file.write_all(&features).unwrap();
        }
        path
    }

    #[test]
    fn non_binary_path_is_refused() {
        let err = load_cifar("/data/cifar-100-python/train").unwrap_err();
        assert!(matches!(err, DatasetError::NotBinaryFormat(_)));
    }

    #[test]
    fn truncated_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, vec![0u8; 100]).unwrap();

        let err = load_cifar(&path).unwrap_err();
        assert!(matches!(err, DatasetError::Truncated { .. }));
    }

    #[test]
    fn single_label_file_partitions_fully() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cifar_file(&dir, "planes.bin", &[CIFAR_PLANE_INDEX]);

        let partitions = load_cifar(&path).unwrap();
        assert_eq!(partitions.len(), 1);
        let planes = &partitions[&CIFAR_PLANE_INDEX];
        assert_eq!(planes.len(), RECORDS_PER_FILE);
        assert!(planes.iter().all(|v| v.len() == RECORD_DIM));
    }

    #[test]
    fn features_are_raw_byte_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cifar_file(&dir, "raw.bin", &[CIFAR_PLANE_INDEX]);

        let partitions = load_cifar(&path).unwrap();
        // Record 3's features were written as byte 3 throughout
        let vec = &partitions[&CIFAR_PLANE_INDEX][3];
        assert!(vec.iter().all(|&f| f == 3.0));
    }

    #[test]
    fn concatenation_orders_planes_then_birds() {
        let planes = vec![vec![1.0; RECORD_DIM]; 3];
        let birds = vec![vec![2.0; RECORD_DIM]; 2];
        let mut partitions = LabelPartitions::new();
        partitions.insert(CIFAR_PLANE_INDEX, planes);
        partitions.insert(CIFAR_BIRD_INDEX, birds);

        let (corpus, targets) = concatenate_datapoints(partitions).unwrap();
        assert_eq!(corpus.len(), 5);
        assert_eq!(targets, vec![1.0, 1.0, 1.0, 0.0, 0.0]);
        assert!(corpus[..3].iter().all(|v| v[0] == 1.0));
        assert!(corpus[3..].iter().all(|v| v[0] == 2.0));
    }

    #[test]
    fn missing_partition_fails() {
        let mut partitions = LabelPartitions::new();
        partitions.insert(CIFAR_PLANE_INDEX, vec![vec![0.0; RECORD_DIM]]);

        let err = concatenate_datapoints(partitions).unwrap_err();
        assert!(matches!(err, DatasetError::MissingLabel(CIFAR_BIRD_INDEX)));
    }
}

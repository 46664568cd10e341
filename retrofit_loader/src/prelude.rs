/* Built-in declarations of the library types generated code refers to */

use anyhow::Context;

use crate::file::ModelFile;

const PRELUDE_YAML: &str = include_str!("../prelude/library.model.yaml");

/* Parse the embedded prelude model */
pub fn prelude_file() -> anyhow::Result<ModelFile> {
    ModelFile::from_yaml(PRELUDE_YAML).context("Failed to parse built-in prelude model")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_declares_marker_types() {
        let file = prelude_file().unwrap();
        let names: Vec<String> = file
            .packaged_types()
            .iter()
            .map(|t| format!("{}.{}", t.package.as_deref().unwrap_or(""), t.name))
            .collect();
        for expected in [
            "java.lang.Object",
            "java.lang.String",
            "java.util.BitSet",
            "java.io.File",
            "rx.Observable",
            "retrofit.Callback",
            "retrofit.client.Response",
            "retrofit.mime.TypedString",
            "retrofit.converter.GsonConverter",
            "android.os.Parcelable",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }
}

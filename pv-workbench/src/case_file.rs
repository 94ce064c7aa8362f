//! Case files: one module's inputs and solution as a tagged JSON record
//!
//! Every value is stored as text, the way it would sit in an input field.
//! Solution fields are empty strings until a solve has completed.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use pv_extractor::{
    ExtractionInputs, ExtractionResult, ModuleRatings, OperatingCondition, SolverSeed,
};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use thiserror::Error;

/// Discriminator stored under the `"file type"` key
pub const CASE_FILE_TYPE: &str = "solar panel circuit model parameters";

/// Extension appended to case file paths that lack it
pub const CASE_FILE_EXTENSION: &str = "json";

/// Error while reading, writing or interpreting a case file
#[derive(Error, Debug)]
pub enum CaseFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `found` is `None` when the record has no `"file type"` key
    #[error("not a case file: {}", describe_file_type(.found))]
    WrongFileType { found: Option<String> },

    #[error("field {name} has invalid value '{value}'")]
    InvalidField { name: &'static str, value: String },
}

fn describe_file_type(found: &Option<String>) -> String {
    match found {
        Some(file_type) => format!("file type is '{file_type}'"),
        None => "no file type".to_string(),
    }
}

/// On-disk layout of a case file; field order is the key order written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseFile {
    #[serde(rename = "file type")]
    pub file_type: String,

    pub v_oc_stc: String,
    pub i_sc_stc: String,
    pub v_mp: String,
    pub i_mp: String,
    pub temp_coeff_v_perc: String,
    pub temp_coeff_i_perc: String,
    pub n_cell: String,
    pub temperature_c: String,
    pub solar_irr: String,
    pub di_dv_sc: String,
    pub di_dv_oc: String,
    pub a_init: String,
    pub r_s_init: String,

    #[serde(default)]
    pub i_ph: String,
    #[serde(default)]
    pub a: String,
    #[serde(default)]
    pub i_o: String,
    #[serde(default)]
    pub r_s: String,
    #[serde(default)]
    pub r_sh: String,
}

fn parse_number(name: &'static str, text: &str) -> Result<f64, CaseFileError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CaseFileError::InvalidField {
            name,
            value: text.to_string(),
        })
}

/// Cell counts are accepted as integers or as whole floats ("72.0")
fn parse_cell_count(text: &str) -> Result<u32, CaseFileError> {
    let invalid = || CaseFileError::InvalidField {
        name: "n_cell",
        value: text.to_string(),
    };

    if let Ok(count) = text.trim().parse::<u32>() {
        return Ok(count);
    }

    let value = parse_number("n_cell", text)?;
    if value.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&value) {
        Ok(value as u32)
    } else {
        Err(invalid())
    }
}

/// Append `.json` unless the path already ends with it, ignoring case
pub fn with_case_extension(path: &Path) -> PathBuf {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CASE_FILE_EXTENSION));

    if has_extension {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(CASE_FILE_EXTENSION);
        PathBuf::from(name)
    }
}

impl CaseFile {
    /// Case for `inputs` with an optional solution
    pub fn new(inputs: &ExtractionInputs, solution: Option<&ExtractionResult>) -> Self {
        let ExtractionInputs {
            ratings,
            condition,
            seed,
        } = inputs;

        let mut case = Self {
            file_type: CASE_FILE_TYPE.to_string(),
            v_oc_stc: ratings.v_oc_stc.to_string(),
            i_sc_stc: ratings.i_sc_stc.to_string(),
            v_mp: ratings.v_mp.to_string(),
            i_mp: ratings.i_mp.to_string(),
            temp_coeff_v_perc: ratings.temp_coeff_v_perc.to_string(),
            temp_coeff_i_perc: ratings.temp_coeff_i_perc.to_string(),
            n_cell: ratings.n_cell.to_string(),
            temperature_c: condition.temperature_c.to_string(),
            solar_irr: condition.solar_irr.to_string(),
            di_dv_sc: ratings.di_dv_sc.to_string(),
            di_dv_oc: ratings.di_dv_oc.to_string(),
            a_init: seed.a_init.to_string(),
            r_s_init: seed.r_s_init.to_string(),
            i_ph: String::new(),
            a: String::new(),
            i_o: String::new(),
            r_s: String::new(),
            r_sh: String::new(),
        };
        case.set_solution(solution);
        case
    }

    /// Replace the solution fields; `None` blanks them
    pub fn set_solution(&mut self, solution: Option<&ExtractionResult>) {
        match solution {
            Some(result) => {
                self.i_ph = result.format_i_ph();
                self.a = result.format_a();
                self.i_o = result.format_i_o();
                self.r_s = result.format_r_s();
                self.r_sh = result.format_r_sh();
            }
            None => {
                for field in [
                    &mut self.i_ph,
                    &mut self.a,
                    &mut self.i_o,
                    &mut self.r_s,
                    &mut self.r_sh,
                ] {
                    field.clear();
                }
            }
        }
    }

    pub fn has_solution(&self) -> bool {
        [&self.i_ph, &self.a, &self.i_o, &self.r_s, &self.r_sh]
            .iter()
            .any(|field| !field.trim().is_empty())
    }

    /// Parse the input fields into extraction inputs
    pub fn inputs(&self) -> Result<ExtractionInputs, CaseFileError> {
        let ratings = ModuleRatings {
            v_oc_stc: parse_number("v_oc_stc", &self.v_oc_stc)?,
            i_sc_stc: parse_number("i_sc_stc", &self.i_sc_stc)?,
            v_mp: parse_number("v_mp", &self.v_mp)?,
            i_mp: parse_number("i_mp", &self.i_mp)?,
            temp_coeff_i_perc: parse_number("temp_coeff_i_perc", &self.temp_coeff_i_perc)?,
            temp_coeff_v_perc: parse_number("temp_coeff_v_perc", &self.temp_coeff_v_perc)?,
            n_cell: parse_cell_count(&self.n_cell)?,
            di_dv_sc: parse_number("di_dv_sc", &self.di_dv_sc)?,
            di_dv_oc: parse_number("di_dv_oc", &self.di_dv_oc)?,
        };
        let condition = OperatingCondition::new(
            parse_number("temperature_c", &self.temperature_c)?,
            parse_number("solar_irr", &self.solar_irr)?,
        );
        let seed = SolverSeed::new(
            parse_number("a_init", &self.a_init)?,
            parse_number("r_s_init", &self.r_s_init)?,
        );

        Ok(ExtractionInputs {
            ratings,
            condition,
            seed,
        })
    }

    /// Parse the stored solution, `None` when the solution fields are blank
    pub fn solution(&self) -> Result<Option<ExtractionResult>, CaseFileError> {
        if !self.has_solution() {
            return Ok(None);
        }

        Ok(Some(ExtractionResult {
            i_ph: parse_number("i_ph", &self.i_ph)?,
            a: parse_number("a", &self.a)?,
            i_o: parse_number("i_o", &self.i_o)?,
            r_s: parse_number("r_s", &self.r_s)?,
            r_sh: parse_number("r_sh", &self.r_sh)?,
        }))
    }

    /// Load a case file and check its discriminator
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CaseFileError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let record: serde_json::Value = serde_json::from_reader(reader)?;

        match record.get("file type") {
            Some(serde_json::Value::String(file_type)) if file_type == CASE_FILE_TYPE => {}
            Some(serde_json::Value::String(file_type)) => {
                return Err(CaseFileError::WrongFileType {
                    found: Some(file_type.clone()),
                })
            }
            Some(other) => {
                return Err(CaseFileError::WrongFileType {
                    found: Some(other.to_string()),
                })
            }
            None => return Err(CaseFileError::WrongFileType { found: None }),
        }

        Ok(serde_json::from_value(record)?)
    }

    /// Write the case with four-space indentation, appending `.json` to the
    /// path when missing. Returns the path actually written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf, CaseFileError> {
        let path = with_case_extension(path.as_ref());
        let file = File::create(&path)?;
        let writer = BufWriter::new(file);
        let mut serializer =
            serde_json::Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer)?;
        serializer.into_inner().flush()?;
        Ok(path)
    }
}

impl Default for CaseFile {
    /// The reference module, unsolved
    fn default() -> Self {
        Self::new(&ExtractionInputs::default(), None)
    }
}

//! The three fixed note models embedded in every package.
//!
//! Model ids, fields, templates, and styling are constants: decks built by
//! separate requests must carry bit-identical model definitions so the
//! importing application can merge them.

use serde_json::{json, Value};

use crate::types::NoteType;

pub const BASIC_MODEL_ID: i64 = 1_607_392_319;
pub const REVERSE_MODEL_ID: i64 = BASIC_MODEL_ID + 1;
pub const CLOZE_MODEL_ID: i64 = 998_877_665;

/// Shared stylesheet for all three models.
pub const CARD_CSS: &str = ".card { font-family: arial; font-size: 16px; text-align: left; }";

const LATEX_PRE: &str = "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n";
const LATEX_POST: &str = "\\end{document}";

/// One rendering rule of a model: question and answer format strings.
#[derive(Debug)]
pub struct Template {
    pub name: &'static str,
    pub qfmt: &'static str,
    pub afmt: &'static str,
}

/// A fixed note model: identifier, ordered fields, and templates.
///
/// `cloze` marks the model as a cloze type, which makes the importing
/// application expand `{{cN::...}}` markers into one card per deletion.
#[derive(Debug)]
pub struct Model {
    pub id: i64,
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub templates: &'static [Template],
    pub cloze: bool,
}

pub static BASIC_MODEL: Model = Model {
    id: BASIC_MODEL_ID,
    name: "Basic",
    fields: &["Front", "Back"],
    templates: &[Template {
        name: "Card 1",
        qfmt: "{{Front}}",
        afmt: "{{FrontSide}}<hr id=\"answer\">{{Back}}",
    }],
    cloze: false,
};

pub static REVERSE_MODEL: Model = Model {
    id: REVERSE_MODEL_ID,
    name: "Basic (and reverse)",
    fields: &["Front", "Back"],
    templates: &[
        Template {
            name: "Forward",
            qfmt: "{{Front}}",
            afmt: "{{FrontSide}}<hr id=\"answer\">{{Back}}",
        },
        Template {
            name: "Reverse",
            qfmt: "{{Back}}",
            afmt: "{{Back}}<hr id=\"answer\">{{Front}}",
        },
    ],
    cloze: false,
};

pub static CLOZE_MODEL: Model = Model {
    id: CLOZE_MODEL_ID,
    name: "Cloze",
    fields: &["Text"],
    templates: &[Template {
        name: "Cloze",
        qfmt: "{{cloze:Text}}",
        afmt: "{{cloze:Text}}",
    }],
    cloze: true,
};

/// All models, embedded in every package regardless of which note types
/// the deck actually uses, so any two generated decks carry identical
/// model definitions.
pub static ALL_MODELS: [&Model; 3] = [&BASIC_MODEL, &REVERSE_MODEL, &CLOZE_MODEL];

/// Look up the model a note type binds to.
pub fn model_for(note_type: NoteType) -> &'static Model {
    match note_type {
        NoteType::Basic => &BASIC_MODEL,
        NoteType::BasicAndReverse => &REVERSE_MODEL,
        NoteType::Cloze => &CLOZE_MODEL,
    }
}

impl Model {
    /// Render the model as the JSON object stored in the collection's
    /// `col.models` blob.
    pub fn to_json(&self, mod_ts: i64, deck_id: i64) -> Value {
        let flds: Vec<Value> = self
            .fields
            .iter()
            .enumerate()
            .map(|(ord, name)| {
                json!({
                    "name": name,
                    "ord": ord,
                    "sticky": false,
                    "rtl": false,
                    "font": "Liberation Sans",
                    "size": 20,
                    "media": [],
                })
            })
            .collect();

        let tmpls: Vec<Value> = self
            .templates
            .iter()
            .enumerate()
            .map(|(ord, tmpl)| {
                json!({
                    "name": tmpl.name,
                    "ord": ord,
                    "qfmt": tmpl.qfmt,
                    "afmt": tmpl.afmt,
                    "bqfmt": "",
                    "bafmt": "",
                    "did": null,
                })
            })
            .collect();

        let mut model = json!({
            "id": self.id,
            "name": self.name,
            "type": if self.cloze { 1 } else { 0 },
            "mod": mod_ts,
            "usn": -1,
            "sortf": 0,
            "did": deck_id,
            "flds": flds,
            "tmpls": tmpls,
            "css": CARD_CSS,
            "latexPre": LATEX_PRE,
            "latexPost": LATEX_POST,
            "tags": [],
            "vers": [],
        });

        // Standard models declare which fields each template needs; cloze
        // models omit the block.
        if !self.cloze {
            model["req"] = self.requirements();
        }
        model
    }

    /// Per-template field requirements: a template is renderable when all
    /// fields referenced by its question format are non-empty.
    fn requirements(&self) -> Value {
        let reqs: Vec<Value> = self
            .templates
            .iter()
            .enumerate()
            .map(|(ord, tmpl)| {
                let needed: Vec<usize> = self
                    .fields
                    .iter()
                    .enumerate()
                    .filter(|(_, name)| tmpl.qfmt.contains(&format!("{{{{{}}}}}", name)))
                    .map(|(idx, _)| idx)
                    .collect();
                json!([ord, "all", needed])
            })
            .collect();
        Value::Array(reqs)
    }
}

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::Array2;

use super::model::F5Error;

/// Id returned for tokens missing from the vocabulary.
///
/// This is also the id of whatever token sits on the first line of the
/// vocabulary file, so an unknown token is indistinguishable from that token
/// once encoded. Use [`Vocab::lookup`] to tell them apart.
pub const UNKNOWN_TOKEN_ID: i32 = 0;

/// Value used to right-pad rows of an index buffer.
pub const PAD_ID: i32 = -1;

/// Line-ordered token vocabulary: the token on line `n` (0-based) has id `n`.
#[derive(Debug, Clone, Default)]
pub struct Vocab {
    ids: HashMap<String, i32>,
}

impl Vocab {
    /// Load a vocabulary file with one token per line.
    ///
    /// Only the line terminator is stripped, so a line holding a single space
    /// is the space token. If a token repeats, the later line wins.
    pub fn load(path: &Path) -> Result<Self, F5Error> {
        let vocab_err = |source| F5Error::VocabLoad {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(vocab_err)?;
        let reader = BufReader::new(file);

        let mut ids = HashMap::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(vocab_err)?;
            let token = line.trim_end_matches(['\r', '\n']);
            ids.insert(token.to_string(), i as i32);
        }

        log::info!("Loaded {} vocabulary entries from {}", ids.len(), path.display());
        Ok(Self { ids })
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Id of `token`, or `None` when it is not in the vocabulary.
    pub fn lookup(&self, token: &str) -> Option<i32> {
        self.ids.get(token).copied()
    }

    /// Id of `token`, falling back to [`UNKNOWN_TOKEN_ID`].
    pub fn id(&self, token: &str) -> i32 {
        self.lookup(token).unwrap_or_else(|| {
            log::debug!("Token {token:?} not in vocabulary, using id {UNKNOWN_TOKEN_ID}");
            UNKNOWN_TOKEN_ID
        })
    }

    /// Encode a batch of token sequences into a `[batch, max_len]` index buffer.
    ///
    /// Rows are right-padded with [`PAD_ID`]; nothing is truncated.
    pub fn encode<S: AsRef<str>>(&self, sequences: &[Vec<S>]) -> Array2<i32> {
        let max_len = sequences.iter().map(Vec::len).max().unwrap_or(0);
        let mut buffer = Array2::from_elem((sequences.len(), max_len), PAD_ID);

        for (mut row, tokens) in buffer.rows_mut().into_iter().zip(sequences) {
            for (slot, token) in row.iter_mut().zip(tokens) {
                *slot = self.id(token.as_ref());
            }
        }

        buffer
    }
}

impl<S: Into<String>> FromIterator<S> for Vocab {
    /// Build a vocabulary from tokens in id order.
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let ids = iter
            .into_iter()
            .enumerate()
            .map(|(i, token)| (token.into(), i as i32))
            .collect();
        Self { ids }
    }
}

#[cfg(test)]
mod tests {
    use super::{Vocab, PAD_ID, UNKNOWN_TOKEN_ID};
    use std::io::Write;

    fn small_vocab() -> Vocab {
        ["a", "b", " "].into_iter().collect()
    }

    #[test]
    fn load_assigns_ids_by_line_and_strips_crlf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, " \r\na\r\nni3\nhao3\n").unwrap();

        let vocab = Vocab::load(file.path()).unwrap();
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.lookup(" "), Some(0));
        assert_eq!(vocab.lookup("a"), Some(1));
        assert_eq!(vocab.lookup("ni3"), Some(2));
        assert_eq!(vocab.lookup("hao3"), Some(3));
        assert_eq!(vocab.lookup("a\r"), None);
    }

    #[test]
    fn load_missing_file_is_vocab_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Vocab::load(&dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, super::F5Error::VocabLoad { .. }));
    }

    #[test]
    fn unknown_tokens_map_to_zero() {
        let vocab = small_vocab();
        assert_eq!(vocab.lookup("zz"), None);
        assert_eq!(vocab.id("zz"), UNKNOWN_TOKEN_ID);
    }

    #[test]
    fn encode_single_row_without_padding() {
        let vocab = small_vocab();
        let buffer = vocab.encode(&[vec!["a", "b"]]);
        assert_eq!(buffer.shape(), &[1, 2]);
        assert_eq!(buffer.row(0).to_vec(), vec![0, 1]);
    }

    #[test]
    fn encode_pads_short_rows_on_the_right() {
        let vocab = small_vocab();
        let sequences = vec![
            vec!["a", " ", "b", "a"],
            vec!["b"],
            vec!["x", "a"],
        ];
        let buffer = vocab.encode(&sequences);

        assert_eq!(buffer.nrows(), sequences.len());
        assert_eq!(buffer.ncols(), 4);
        for (row, tokens) in buffer.rows().into_iter().zip(&sequences) {
            let row = row.to_vec();
            assert!(row[..tokens.len()].iter().all(|&id| id != PAD_ID));
            assert!(row[tokens.len()..].iter().all(|&id| id == PAD_ID));
        }
        assert_eq!(buffer.row(0).to_vec(), vec![0, 2, 1, 0]);
        assert_eq!(buffer.row(2).to_vec(), vec![0, 0, -1, -1]);
    }

    #[test]
    fn tokenized_ascii_text_encodes_per_character() {
        let tokenizer = crate::engines::f5::phonemizer::PhoneticTokenizer::new();
        let tokens = tokenizer.tokenize("ab");
        assert_eq!(tokens, vec!["a".to_string(), "b".to_string()]);

        let buffer = small_vocab().encode(&[tokens]);
        assert_eq!(buffer.row(0).to_vec(), vec![0, 1]);
    }

    #[test]
    fn encode_empty_batch() {
        let vocab = small_vocab();
        let buffer = vocab.encode::<&str>(&[]);
        assert_eq!(buffer.shape(), &[0, 0]);
    }
}

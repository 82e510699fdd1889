use crate::BLOCK_WORDS;

/// One pattern block: 16-bit words plus the byte image sent to disk
///
/// Both vectors are allocated once and reused across every transfer of a
/// test. Words are stored little-endian on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordBlock {
    words: Vec<u16>,
    bytes: Vec<u8>,
}

impl Default for WordBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl WordBlock {
    /// A zero-filled block of [`BLOCK_WORDS`] words
    pub fn new() -> Self {
        Self::with_words(BLOCK_WORDS)
    }

    pub fn with_words(count: usize) -> Self {
        Self {
            words: vec![0; count],
            bytes: vec![0; count * 2],
        }
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Mutable words; call [`WordBlock::encode`] before writing the block out
    pub fn words_mut(&mut self) -> &mut [u16] {
        &mut self.words
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable byte image; call [`WordBlock::decode`] after reading into it
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Byte length of the block
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Refresh the byte image from the words
    pub fn encode(&mut self) {
        for (word, chunk) in self.words.iter().zip(self.bytes.chunks_exact_mut(2)) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
    }

    /// Refresh the words from the byte image
    pub fn decode(&mut self) {
        for (word, chunk) in self.words.iter_mut().zip(self.bytes.chunks_exact(2)) {
            *word = u16::from_le_bytes([chunk[0], chunk[1]]);
        }
    }

    /// Fill every word with the same value
    pub fn fill(&mut self, value: u16) {
        self.words.fill(value);
        self.encode();
    }

    /// Fill with a repeating sequence of words
    pub fn fill_cycle(&mut self, values: &[u16]) {
        if values.is_empty() {
            return;
        }
        for (word, value) in self.words.iter_mut().zip(values.iter().cycle()) {
            *word = *value;
        }
        self.encode();
    }

    /// Copy another block's contents without reallocating
    pub fn copy_from(&mut self, other: &WordBlock) {
        self.words.copy_from_slice(&other.words);
        self.bytes.copy_from_slice(&other.bytes);
    }
}

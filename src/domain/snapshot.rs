/// Opaque saved position of a list surface.
///
/// The coordinator only stores and hands it back; it never inspects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollSnapshot(Vec<u8>);

impl ScrollSnapshot {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Audio capture sources
pub mod source;
/// Recording buffer writer
pub mod writer;

/// One block of interleaved samples, handed from the capture source to the
/// writer. Produced once, consumed once; ownership moves through the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock(pub Vec<f32>);

impl SampleBlock {
    /// Number of samples in the block
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Message on the source→writer queue. `Seal` is the end-of-stream sentinel;
/// it is enqueued only after the producer has fully shut down.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockMsg {
    /// A captured block of samples
    Block(SampleBlock),
    /// No further blocks will arrive
    Seal,
}

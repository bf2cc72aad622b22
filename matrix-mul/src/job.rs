//! Messages exchanged by the point-to-point strategies.

use matrix_mpi_types::matrix as wire;

use crate::Error;
use crate::kernel;
use crate::matrix::{Matrix, RowBlock};

/// A row block of the first operand together with the whole second operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    block: RowBlock,
    second: Matrix,
}

impl Job {
    pub fn new(block: RowBlock, second: Matrix) -> Self {
        Self { block, second }
    }

    pub fn offset(&self) -> usize {
        self.block.offset()
    }

    /// Multiplies the block by the second operand.
    pub fn execute(&self) -> Result<PartialResult, Error> {
        let product = kernel::multiply(self.block.matrix(), &self.second)?;
        Ok(PartialResult(RowBlock::new(self.block.offset(), product)))
    }
}

/// Rows of the final product, tagged with where they belong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialResult(RowBlock);

impl PartialResult {
    pub fn offset(&self) -> usize {
        self.0.offset()
    }

    pub fn rows(&self) -> &Matrix {
        self.0.matrix()
    }

    /// Writes these rows into `target` at their offset.
    pub fn write_into(&self, target: &mut Matrix) -> Result<(), Error> {
        target.write_rows(self.offset(), self.rows())
    }
}

fn required(data: Option<wire::MatrixData>, field: &str) -> Result<Matrix, Error> {
    data.ok_or_else(|| Error::MalformedMessage(format!("missing {field}")))?
        .try_into()
}

impl From<&Job> for wire::Job {
    fn from(job: &Job) -> Self {
        wire::Job {
            block: Some(job.block.matrix().into()),
            second: Some((&job.second).into()),
            offset: job.block.offset() as u64,
        }
    }
}

impl TryFrom<wire::Job> for Job {
    type Error = Error;

    fn try_from(message: wire::Job) -> Result<Self, Error> {
        let block = required(message.block, "job block")?;
        let second = required(message.second, "second operand")?;
        Ok(Job::new(RowBlock::new(message.offset as usize, block), second))
    }
}

impl From<&PartialResult> for wire::PartialResult {
    fn from(result: &PartialResult) -> Self {
        wire::PartialResult {
            block: Some(result.rows().into()),
            offset: result.offset() as u64,
        }
    }
}

impl TryFrom<wire::PartialResult> for PartialResult {
    type Error = Error;

    fn try_from(message: wire::PartialResult) -> Result<Self, Error> {
        let rows = required(message.block, "result block")?;
        Ok(PartialResult(RowBlock::new(message.offset as usize, rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_computes_rows_at_its_offset() {
        let a = Matrix::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        let b = Matrix::from_rows(vec![vec![5, 6], vec![7, 8]]).unwrap();
        let job = Job::new(RowBlock::new(1, a.row_block(1, 1).unwrap()), b);

        let result = job.execute().unwrap();
        assert_eq!(result.offset(), 1);
        assert_eq!(result.rows().to_rows(), vec![vec![43, 50]]);

        let mut target = Matrix::zeros(2, 2);
        result.write_into(&mut target).unwrap();
        assert_eq!(target.to_rows(), vec![vec![0, 0], vec![43, 50]]);
    }

    #[test]
    fn job_survives_the_wire() {
        let job = Job::new(
            RowBlock::new(2, Matrix::identity(2).row_block(0, 1).unwrap()),
            Matrix::identity(2),
        );
        let decoded = Job::try_from(wire::Job::from(&job)).unwrap();
        assert_eq!(decoded, job);
    }

    #[test]
    fn job_without_operand_is_malformed() {
        let message = wire::Job {
            block: Some((&Matrix::identity(1)).into()),
            second: None,
            offset: 0,
        };
        assert!(matches!(
            Job::try_from(message),
            Err(Error::MalformedMessage(_))
        ));
    }
}

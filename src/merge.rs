use crate::error::Result;
use crate::rating::Partition;
use crate::record::Record;

/// Decodes the current value (or starts from the empty record), combines
/// every operand into it and re-encodes the result.
pub fn fold_packed<'a, P, I>(existing: Option<&[u8]>, operands: I) -> Result<Vec<u8>>
where
    P: Partition,
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut total = match existing {
        Some(bytes) => Record::<P>::unpack(bytes)?,
        None => Record::new(),
    };
    for op in operands {
        total = total.combine(&Record::unpack(op)?);
    }
    Ok(total.pack())
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

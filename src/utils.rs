use ark_ec::Group;
use ark_ff::Field;

use crate::ciphersuite::CipherSuite;
use crate::dkg::MemberId;
use crate::{DkgResult, Error};

/// The scalar field of a [`CipherSuite`]'s group.
pub type Scalar<C> = <<C as CipherSuite>::G as Group>::ScalarField;

/// Compute the Lagrange coefficient at zero of `my_index` over `all_indices`.
pub(crate) fn calculate_lagrange_coefficients<C: CipherSuite>(
    my_index: MemberId,
    all_indices: &[MemberId],
) -> DkgResult<Scalar<C>> {
    let mut numerator = Scalar::<C>::ONE;
    let mut denominator = Scalar::<C>::ONE;

    let my_index_field = Scalar::<C>::from(my_index);

    for &j in all_indices.iter() {
        if j == my_index {
            continue;
        }
        let s = Scalar::<C>::from(j);

        numerator *= s;
        denominator *= s - my_index_field;
    }

    let inverse = denominator.inverse().ok_or(Error::DuplicateShares)?;

    Ok(numerator * inverse)
}

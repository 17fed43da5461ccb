//! Element transfer between zarr arrays and [`ArrayData`]

use geoviz_dataset::{ArrayData, DType};
use zarrs::array::{Array, ArrayError, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::filesystem::FilesystemStore;

/// Map a zarr data type onto the dataset model, if supported
pub(crate) fn dtype_from_zarr(data_type: &DataType) -> Option<DType> {
    let dtype = match data_type {
        DataType::Int8 => DType::Int8,
        DataType::Int16 => DType::Int16,
        DataType::Int32 => DType::Int32,
        DataType::Int64 => DType::Int64,
        DataType::UInt8 => DType::UInt8,
        DataType::UInt16 => DType::UInt16,
        DataType::UInt32 => DType::UInt32,
        DataType::UInt64 => DType::UInt64,
        DataType::Float32 => DType::Float32,
        DataType::Float64 => DType::Float64,
        DataType::String => DType::String,
        _ => return None,
    };
    Some(dtype)
}

/// Zarr data type and fill value used when writing `dtype`
pub(crate) fn zarr_type_for(dtype: DType) -> (DataType, FillValue) {
    match dtype {
        DType::Int8 => (DataType::Int8, FillValue::from(0i8)),
        DType::Int16 => (DataType::Int16, FillValue::from(0i16)),
        DType::Int32 => (DataType::Int32, FillValue::from(0i32)),
        DType::Int64 => (DataType::Int64, FillValue::from(0i64)),
        DType::UInt8 => (DataType::UInt8, FillValue::from(0u8)),
        DType::UInt16 => (DataType::UInt16, FillValue::from(0u16)),
        DType::UInt32 => (DataType::UInt32, FillValue::from(0u32)),
        DType::UInt64 => (DataType::UInt64, FillValue::from(0u64)),
        DType::Float32 => (DataType::Float32, FillValue::from(f32::NAN)),
        DType::Float64 => (DataType::Float64, FillValue::from(f64::NAN)),
        DType::String => (DataType::String, FillValue::new(Vec::new())),
    }
}

/// Read a subset of `array` as `dtype`
pub(crate) fn retrieve(
    array: &Array<FilesystemStore>,
    dtype: DType,
    subset: &ArraySubset,
) -> Result<ArrayData, ArrayError> {
    let data = match dtype {
        DType::Int8 => ArrayData::Int8(array.retrieve_array_subset_elements::<i8>(subset)?),
        DType::Int16 => ArrayData::Int16(array.retrieve_array_subset_elements::<i16>(subset)?),
        DType::Int32 => ArrayData::Int32(array.retrieve_array_subset_elements::<i32>(subset)?),
        DType::Int64 => ArrayData::Int64(array.retrieve_array_subset_elements::<i64>(subset)?),
        DType::UInt8 => ArrayData::UInt8(array.retrieve_array_subset_elements::<u8>(subset)?),
        DType::UInt16 => ArrayData::UInt16(array.retrieve_array_subset_elements::<u16>(subset)?),
        DType::UInt32 => ArrayData::UInt32(array.retrieve_array_subset_elements::<u32>(subset)?),
        DType::UInt64 => ArrayData::UInt64(array.retrieve_array_subset_elements::<u64>(subset)?),
        DType::Float32 => ArrayData::Float32(array.retrieve_array_subset_elements::<f32>(subset)?),
        DType::Float64 => ArrayData::Float64(array.retrieve_array_subset_elements::<f64>(subset)?),
        DType::String => ArrayData::String(array.retrieve_array_subset_elements::<String>(subset)?),
    };
    Ok(data)
}

/// Write all of `data` into `array`
pub(crate) fn store_all(array: &Array<FilesystemStore>, data: &ArrayData) -> Result<(), ArrayError> {
    let subset = array.subset_all();
    match data {
        ArrayData::Int8(v) => array.store_array_subset_elements::<i8>(&subset, v),
        ArrayData::Int16(v) => array.store_array_subset_elements::<i16>(&subset, v),
        ArrayData::Int32(v) => array.store_array_subset_elements::<i32>(&subset, v),
        ArrayData::Int64(v) => array.store_array_subset_elements::<i64>(&subset, v),
        ArrayData::UInt8(v) => array.store_array_subset_elements::<u8>(&subset, v),
        ArrayData::UInt16(v) => array.store_array_subset_elements::<u16>(&subset, v),
        ArrayData::UInt32(v) => array.store_array_subset_elements::<u32>(&subset, v),
        ArrayData::UInt64(v) => array.store_array_subset_elements::<u64>(&subset, v),
        ArrayData::Float32(v) => array.store_array_subset_elements::<f32>(&subset, v),
        ArrayData::Float64(v) => array.store_array_subset_elements::<f64>(&subset, v),
        ArrayData::String(v) => array.store_array_subset_elements::<String>(&subset, v),
    }
}

//! Interpreter-style access to a quantized (half-precision) `PostureNet`
//! artifact: load, allocate, set input, invoke, read output.

use burn::tensor::{Tensor, TensorData};
use data_contracts::ModelPrecision;
use models::PostureNet;
use std::path::Path;
use vision_core::interfaces::{Classifier, ClassifierError, Frame};
use vision_core::preprocess::frame_to_input;

use crate::factory::load_posture_net;
use crate::{InferenceBackend, InferenceError};

type Device = <InferenceBackend as burn::tensor::backend::Backend>::Device;

const INPUT_TENSORS: usize = 1;
const OUTPUT_TENSORS: usize = 1;

pub struct QuantizedInterpreter {
    model: PostureNet<InferenceBackend>,
    input_size: u32,
    device: Device,
    input: Option<Vec<f32>>,
    output: Option<f32>,
}

impl QuantizedInterpreter {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        Self::load_as(path, None)
    }

    pub(crate) fn load_as(
        path: &Path,
        precision: Option<ModelPrecision>,
    ) -> Result<Self, InferenceError> {
        let device = Device::default();
        let (model, manifest) = load_posture_net(path, precision, ModelPrecision::Half, &device)?;
        Ok(Self {
            model,
            input_size: manifest.input_size,
            device,
            input: None,
            output: None,
        })
    }

    /// `[1, 3, side, side]`.
    pub fn input_shape(&self) -> [usize; 4] {
        let side = self.input_size as usize;
        [1, 3, side, side]
    }

    pub fn input_len(&self) -> usize {
        self.input_shape().iter().product()
    }

    pub fn allocate_tensors(&mut self) {
        self.input = Some(vec![0.0; self.input_len()]);
        self.output = None;
    }

    pub fn set_input(&mut self, index: usize, data: &[f32]) -> Result<(), InferenceError> {
        check_index("input", index, INPUT_TENSORS)?;
        let expected = self.input_len();
        let buf = self.input.as_mut().ok_or(InferenceError::NotAllocated)?;
        if data.len() != expected {
            return Err(InferenceError::InputLength {
                expected,
                actual: data.len(),
            });
        }
        buf.copy_from_slice(data);
        self.output = None;
        Ok(())
    }

    pub fn invoke(&mut self) -> Result<(), InferenceError> {
        let input = self.input.as_ref().ok_or(InferenceError::NotAllocated)?;
        let tensor = Tensor::<InferenceBackend, 4>::from_data(
            TensorData::new(input.clone(), self.input_shape()),
            &self.device,
        );
        self.output = None;
        let value = first_value(self.model.forward(tensor).into_data())?;
        self.output = Some(value);
        Ok(())
    }

    pub fn output(&self, index: usize) -> Result<f32, InferenceError> {
        check_index("output", index, OUTPUT_TENSORS)?;
        self.output.ok_or(InferenceError::NotInvoked)
    }
}

fn first_value(data: TensorData) -> Result<f32, InferenceError> {
    let values = data
        .to_vec::<f32>()
        .map_err(|e| InferenceError::Output(format!("{e:?}")))?;
    values
        .first()
        .copied()
        .ok_or_else(|| InferenceError::Output("model produced no output".into()))
}

fn check_index(kind: &'static str, index: usize, count: usize) -> Result<(), InferenceError> {
    if index < count {
        Ok(())
    } else {
        Err(InferenceError::TensorIndex { kind, index, count })
    }
}

impl Classifier for QuantizedInterpreter {
    fn predict(&mut self, frame: &Frame) -> Result<f32, ClassifierError> {
        if self.input.is_none() {
            self.allocate_tensors();
        }
        let input = frame_to_input(frame, self.input_size)?;
        let run = |interp: &mut Self| -> Result<f32, InferenceError> {
            interp.set_input(0, &input)?;
            interp.invoke()?;
            interp.output(0)
        };
        run(self).map_err(|e| ClassifierError::Inference(e.to_string()))
    }
}

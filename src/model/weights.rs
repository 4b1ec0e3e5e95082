//! DCGAN weight initialisation
//!
//! Convolution weights ~ N(0, 0.02), BatchNorm scale ~ N(1, 0.02),
//! BatchNorm shift = 0. Running statistics are left alone.

use tch::nn::VarStore;

const INIT_STD: f64 = 0.02;

/// Role of a variable in a DCGAN network, derived from its var-store name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    ConvWeight,
    NormWeight,
    NormBias,
    Other,
}

/// Classify a variable name such as `convt2.weight` or `bn1.bias`
pub fn param_kind(name: &str) -> ParamKind {
    let Some((layer, param)) = name.rsplit_once('.') else {
        return ParamKind::Other;
    };
    let layer = layer.rsplit('.').next().unwrap_or(layer);

    if layer.starts_with("conv") && param == "weight" {
        ParamKind::ConvWeight
    } else if layer.starts_with("bn") {
        match param {
            "weight" => ParamKind::NormWeight,
            "bias" => ParamKind::NormBias,
            _ => ParamKind::Other,
        }
    } else {
        ParamKind::Other
    }
}

/// Re-initialise every convolution and batch-norm parameter in `vs`
pub fn init_weights(vs: &VarStore) {
    tch::no_grad(|| {
        for (name, mut var) in vs.variables() {
            match param_kind(&name) {
                ParamKind::ConvWeight => {
                    let _ = var.normal_(0.0, INIT_STD);
                }
                ParamKind::NormWeight => {
                    let _ = var.normal_(1.0, INIT_STD);
                }
                ParamKind::NormBias => {
                    let _ = var.zero_();
                }
                ParamKind::Other => {}
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::generator::{Generator, GeneratorConfig};
    use tch::{Device, Kind};

    #[test]
    fn test_param_kind() {
        assert_eq!(param_kind("convt0.weight"), ParamKind::ConvWeight);
        assert_eq!(param_kind("conv3.weight"), ParamKind::ConvWeight);
        assert_eq!(param_kind("bn1.weight"), ParamKind::NormWeight);
        assert_eq!(param_kind("bn1.bias"), ParamKind::NormBias);
        assert_eq!(param_kind("bn1.running_mean"), ParamKind::Other);
        assert_eq!(param_kind("net.bn2.bias"), ParamKind::NormBias);
        assert_eq!(param_kind("weight"), ParamKind::Other);
    }

    #[test]
    fn test_init_weights_statistics() {
        let vs = VarStore::new(Device::Cpu);
        let _gen = Generator::new(&vs.root(), GeneratorConfig::default()).unwrap();
        init_weights(&vs);

        let vars = vs.variables();

        let conv = &vars["convt1.weight"];
        let std = conv.std(true).double_value(&[]);
        let mean = conv.mean(Kind::Float).double_value(&[]);
        assert!((std - 0.02).abs() < 0.002, "std was {}", std);
        assert!(mean.abs() < 0.002, "mean was {}", mean);

        let bn_weight = vars["bn1.weight"].mean(Kind::Float).double_value(&[]);
        assert!((bn_weight - 1.0).abs() < 0.01);

        let bn_bias = vars["bn1.bias"].abs().max().double_value(&[]);
        assert_eq!(bn_bias, 0.0);

        let running_var = vars["bn1.running_var"].mean(Kind::Float).double_value(&[]);
        assert_eq!(running_var, 1.0);
    }
}

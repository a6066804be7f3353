//! Example demonstrating how each misuse of the estimator is reported.

use linclass_helpers::LinearError;
use logistic_regression::{LogisticRegression, OptimizerConfig};
use ndarray::array;
use sgd::SgdOptimizer;

fn main() {
    println!("Logistic Regression Error Handling Examples");
    println!("===========================================");

    // Example 1: invalid hyper-parameters are rejected at construction
    println!("\n1. Handling a non-positive step size:");
    match SgdOptimizer::new(1.0, 0.0) {
        Ok(_) => println!("   Optimizer created successfully"),
        Err(e @ LinearError::Configuration { .. }) => println!("   ✓ Caught expected error: {}", e),
        Err(e) => println!("   ✗ Unexpected error: {}", e),
    }

    println!("\n2. Handling an unknown optimizer kind:");
    match OptimizerConfig::<f64>::from_kind("newton", 1.0, None) {
        Ok(_) => println!("   Config created successfully"),
        Err(e) => println!("   ✓ Caught expected error: {}", e),
    }

    // Example 3: inference before training
    println!("\n3. Predicting before fit:");
    let x = array![[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]];
    let y = array![1.0, 1.0, -1.0, -1.0];
    let optimizer = match SgdOptimizer::new(1.0, 0.1) {
        Ok(optimizer) => optimizer,
        Err(e) => {
            println!("   ✗ Unexpected error: {}", e);
            return;
        }
    };
    let mut model = LogisticRegression::new(optimizer);
    match model.predict(x.view()) {
        Ok(p) => println!("   Predicted: {}", p),
        Err(e @ LinearError::NotFitted { .. }) => println!("   ✓ Caught expected error: {}", e),
        Err(e) => println!("   ✗ Unexpected error: {}", e),
    }

    // Example 4: labels must be -1 / +1
    println!("\n4. Fitting with 0/1 labels:");
    let zero_one = array![1.0, 1.0, 0.0, 0.0];
    match model.fit(x.view(), zero_one.view(), 10, false) {
        Ok(_) => println!("   Model trained"),
        Err(e) => println!("   ✓ Caught expected error: {}", e),
    }

    // Example 5: a successful fit, then a width change
    println!("\n5. Changing the feature width after fit:");
    match model.fit(x.view(), y.view(), 50, false) {
        Ok((w, _)) => println!("   ✓ Trained, w = {}", w),
        Err(e) => println!("   ✗ Training failed: {}", e),
    }
    let wider = array![[1.0, 0.0, 3.0]];
    match model.predict(wider.view()) {
        Ok(p) => println!("   Predicted: {}", p),
        Err(e) => println!("   ✓ Caught expected error: {}", e),
    }

    // Example 6: a step size large enough to diverge
    println!("\n6. Diverging step size:");
    let far = array![[1e200], [-1e200]];
    let labels = array![-1.0, 1.0];
    if let Ok(optimizer) = SgdOptimizer::new(1.0, 1e200) {
        let mut model = LogisticRegression::new(optimizer);
        match model.fit(far.view(), labels.view(), 5, false) {
            Ok(_) => println!("   Model trained"),
            Err(e) => println!("   ✓ Caught expected error: {}", e),
        }
    }
}
